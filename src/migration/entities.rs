use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::mapping::{FieldKind, FieldSpec, MappedRecord, Rule};
use crate::error::PropDbError;
use crate::types::SqlValue;

const PROPERTY_TYPES: &[(&str, &str)] = &[
    ("Office", "office"),
    ("Retail", "retail"),
    ("Industrial", "industrial"),
    ("Warehouse", "warehouse"),
    ("Mixed Use", "mixed-use"),
    ("Mixed-Use", "mixed-use"),
];

const LEASE_STATUSES: &[(&str, &str)] = &[
    ("Active", "active"),
    ("Expired", "expired"),
    ("Terminated", "terminated"),
    ("Renewed", "renewed"),
];

const INVOICE_TYPES: &[(&str, &str)] = &[
    ("Rent", "rent"),
    ("Rental", "rent"),
    ("Utilities", "utilities"),
    ("Maintenance", "maintenance"),
    ("Other", "other"),
];

const PROPERTY_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("name", "Name", &["PropertyName", "name"], FieldKind::Text, Rule::Required),
    FieldSpec::new(
        "type",
        "Property type",
        &["PropertyType", "type"],
        FieldKind::Enum {
            map: PROPERTY_TYPES,
            default: "office",
        },
        Rule::Optional,
    ),
    FieldSpec::new("address", "Address", &["Address1", "address"], FieldKind::Text, Rule::Required),
    FieldSpec::new("city", "City", &["City", "city"], FieldKind::Text, Rule::Required),
    FieldSpec::new("province", "Province", &["Province", "province"], FieldKind::Text, Rule::Required),
    FieldSpec::new(
        "postal_code",
        "Postal code",
        &["PostalCode", "postal_code"],
        FieldKind::Text,
        Rule::Optional,
    ),
    FieldSpec::new(
        "description",
        "Description",
        &["Description", "description"],
        FieldKind::Text,
        Rule::Optional,
    ),
    FieldSpec::new(
        "total_area",
        "Total area",
        &["TotalSQM", "total_area"],
        FieldKind::Decimal,
        Rule::PositiveIfSet,
    ),
];

const TENANT_FIELDS: &[FieldSpec] = &[
    FieldSpec::new(
        "company_name",
        "Company name",
        &["CompanyName", "company_name"],
        FieldKind::Text,
        Rule::Required,
    ),
    FieldSpec::new(
        "contact_name",
        "Contact name",
        &["ContactPerson", "contact_name"],
        FieldKind::Text,
        Rule::Required,
    ),
    FieldSpec::new("email", "Email", &["Email", "email"], FieldKind::Text, Rule::Email),
    FieldSpec::new("phone", "Phone", &["Phone", "phone"], FieldKind::Text, Rule::Optional),
    FieldSpec::new("address", "Address", &["Address", "address"], FieldKind::Text, Rule::Optional),
    FieldSpec::new("city", "City", &["City", "city"], FieldKind::Text, Rule::Optional),
    FieldSpec::new("province", "Province", &["Province", "province"], FieldKind::Text, Rule::Optional),
    FieldSpec::new(
        "postal_code",
        "Postal code",
        &["PostalCode", "postal_code"],
        FieldKind::Text,
        Rule::Optional,
    ),
    FieldSpec::new(
        "vat_number",
        "VAT number",
        &["VATNumber", "vat_number"],
        FieldKind::Text,
        Rule::Optional,
    ),
    FieldSpec::new(
        "registration_number",
        "Registration number",
        &["RegNumber", "registration_number"],
        FieldKind::Text,
        Rule::Optional,
    ),
];

const LEASE_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("tenant_id", "Tenant ID", &["TenantID", "tenant_id"], FieldKind::Integer, Rule::Required),
    FieldSpec::new("unit_id", "Unit ID", &["UnitID", "unit_id"], FieldKind::Integer, Rule::Required),
    FieldSpec::new("start_date", "Start date", &["StartDate", "start_date"], FieldKind::Text, Rule::Required),
    FieldSpec::new("end_date", "End date", &["EndDate", "end_date"], FieldKind::Text, Rule::Required),
    FieldSpec::new(
        "monthly_rent",
        "Monthly rent",
        &["MonthlyRental", "monthly_rent"],
        FieldKind::Decimal,
        Rule::Positive,
    ),
    FieldSpec::new("deposit", "Deposit", &["Deposit", "deposit"], FieldKind::Decimal, Rule::Optional),
    FieldSpec::new(
        "escalation_rate",
        "Escalation rate",
        &["EscalationRate", "escalation_rate"],
        FieldKind::Decimal,
        Rule::Optional,
    ),
    FieldSpec::new(
        "status",
        "Status",
        &["Status", "status"],
        FieldKind::Enum {
            map: LEASE_STATUSES,
            default: "active",
        },
        Rule::Optional,
    ),
    FieldSpec::new("terms", "Terms", &["Terms", "terms"], FieldKind::Text, Rule::Optional),
];

const INVOICE_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("lease_id", "Lease ID", &["LeaseID", "lease_id"], FieldKind::Integer, Rule::Required),
    FieldSpec::new("amount", "Amount", &["Amount", "amount"], FieldKind::Decimal, Rule::Positive),
    FieldSpec::new("due_date", "Due date", &["DueDate", "due_date"], FieldKind::Text, Rule::Optional),
    FieldSpec::new(
        "description",
        "Description",
        &["Description", "description"],
        FieldKind::Text,
        Rule::Optional,
    ),
    FieldSpec::new(
        "type",
        "Type",
        &["Type", "type"],
        FieldKind::Enum {
            map: INVOICE_TYPES,
            default: "other",
        },
        Rule::Optional,
    ),
    FieldSpec::new(
        "status",
        "Status",
        &["Status", "status"],
        FieldKind::LowerText { default: "pending" },
        Rule::Optional,
    ),
];

/// The record kinds a CSV file can be imported as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Property,
    Tenant,
    Lease,
    Invoice,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Property,
        EntityKind::Tenant,
        EntityKind::Lease,
        EntityKind::Invoice,
    ];

    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Property => "properties",
            EntityKind::Tenant => "tenants",
            EntityKind::Lease => "leases",
            EntityKind::Invoice => "invoices",
        }
    }

    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            EntityKind::Property => PROPERTY_FIELDS,
            EntityKind::Tenant => TENANT_FIELDS,
            EntityKind::Lease => LEASE_FIELDS,
            EntityKind::Invoice => INVOICE_FIELDS,
        }
    }

    /// Human-readable label for a record, `row <n>` when it has no natural name.
    pub(crate) fn subject(self, record: &MappedRecord, row: usize) -> String {
        let text = |column: &str| record.get(column).filter(|v| !v.is_null()).map(SqlValue::to_string);

        let natural = match self {
            EntityKind::Property => text("name"),
            EntityKind::Tenant => text("company_name"),
            EntityKind::Lease => match (text("tenant_id"), text("unit_id")) {
                (Some(tenant), Some(unit)) => Some(format!("Tenant {} - Unit {}", tenant, unit)),
                _ => None,
            },
            EntityKind::Invoice => text("lease_id").map(|lease| format!("Lease {}", lease)),
        };
        natural.unwrap_or_else(|| format!("row {}", row))
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Property => "property",
            EntityKind::Tenant => "tenant",
            EntityKind::Lease => "lease",
            EntityKind::Invoice => "invoice",
        };
        f.write_str(s)
    }
}

impl FromStr for EntityKind {
    type Err = PropDbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "property" | "properties" => Ok(EntityKind::Property),
            "tenant" | "tenants" => Ok(EntityKind::Tenant),
            "lease" | "leases" => Ok(EntityKind::Lease),
            "invoice" | "invoices" => Ok(EntityKind::Invoice),
            other => Err(PropDbError::InvalidConfig(format!(
                "unknown entity kind '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use csv::StringRecord;

    use super::super::mapping::{map_record, HeaderIndex};
    use super::*;

    fn map(kind: EntityKind, headers: &[&str], row: &[&str]) -> MappedRecord {
        let index = HeaderIndex::new(&StringRecord::from(headers.to_vec()));
        map_record(kind.fields(), &index, &StringRecord::from(row.to_vec()))
    }

    #[test]
    fn test_property_contract() {
        let record = map(
            EntityKind::Property,
            &["PropertyName", "PropertyType", "Address1", "City", "Province", "TotalSQM"],
            &["Dock House", "Mixed-Use", "1 Quay Rd", "Cape Town", "WC", "850.5"],
        );
        assert!(record.is_valid(), "{:?}", record.problems);
        assert_eq!(record.get("type"), Some(&SqlValue::Text("mixed-use".to_string())));
        assert_eq!(record.get("total_area"), Some(&SqlValue::Float64(850.5)));
        assert_eq!(record.get("postal_code"), Some(&SqlValue::Null));
        assert_eq!(EntityKind::Property.subject(&record, 1), "Dock House");
    }

    #[test]
    fn test_lease_problems_and_subject() {
        let record = map(
            EntityKind::Lease,
            &["TenantID", "UnitID", "StartDate", "MonthlyRental", "Status"],
            &["4", "9", "2024-01-01", "0", "On Hold"],
        );
        assert_eq!(
            record.problems,
            vec![
                "End date is required".to_string(),
                "Monthly rent must be positive".to_string()
            ]
        );
        assert_eq!(record.get("status"), Some(&SqlValue::Text("active".to_string())));
        assert_eq!(EntityKind::Lease.subject(&record, 2), "Tenant 4 - Unit 9");
    }

    #[test]
    fn test_invoice_defaults() {
        let record = map(
            EntityKind::Invoice,
            &["LeaseID", "Amount", "Type", "Status"],
            &["3", "1200", "Rental", "PAID"],
        );
        assert!(record.is_valid());
        assert_eq!(record.get("type"), Some(&SqlValue::Text("rent".to_string())));
        assert_eq!(record.get("status"), Some(&SqlValue::Text("paid".to_string())));

        let record = map(EntityKind::Invoice, &["LeaseID", "Amount"], &["", "-1"]);
        assert_eq!(record.get("status"), Some(&SqlValue::Text("pending".to_string())));
        assert_eq!(
            record.problems,
            vec!["Lease ID is required".to_string(), "Amount must be positive".to_string()]
        );
        assert_eq!(EntityKind::Invoice.subject(&record, 7), "row 7");
    }

    #[test]
    fn test_tenant_email_rule() {
        let record = map(
            EntityKind::Tenant,
            &["CompanyName", "ContactPerson", "Email"],
            &["Acme", "Jo", "jo.acme.example"],
        );
        assert_eq!(record.problems, vec!["Invalid email format".to_string()]);
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("Properties".parse::<EntityKind>().unwrap(), EntityKind::Property);
        assert!("payments".parse::<EntityKind>().is_err());
    }
}
