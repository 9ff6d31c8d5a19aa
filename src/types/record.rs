use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::RecordTable;
use crate::error::{Error, Result};

/// Metadata shared by every record table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMeta {
    /// Primary key, a UUID v4 string. Never reassigned.
    pub id: String,
    /// Human-readable ID such as `BGP-IN-AB12CD`.
    pub formatted_id: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    /// Copied from the creator's profile at insert time on scoped tables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub table: RecordTable,
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(flatten)]
    pub fields: RecordFields,
}

/// A record about to be inserted. `created_at` is assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub id: String,
    pub formatted_id: String,
    pub created_by: String,
    pub business_unit: Option<String>,
    pub fields: RecordFields,
}

impl Record {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.meta.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoodsIn {
    pub date: NaiveDate,
    pub time: Option<String>,
    pub supplier: String,
    pub description: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub vehicle_number: Option<String>,
    pub driver_name: Option<String>,
    pub received_by: String,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoodsOut {
    pub date: NaiveDate,
    pub time: Option<String>,
    pub recipient: String,
    pub description: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub vehicle_number: Option<String>,
    pub driver_name: Option<String>,
    pub released_by: String,
    pub authorized_by: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeopleIn {
    pub date: NaiveDate,
    pub time_in: Option<String>,
    pub name: String,
    pub company: Option<String>,
    pub id_number: Option<String>,
    pub purpose: String,
    pub host: Option<String>,
    pub badge_number: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeopleOut {
    pub date: NaiveDate,
    pub time_out: Option<String>,
    pub name: String,
    pub company: Option<String>,
    pub id_number: Option<String>,
    pub badge_number: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailIn {
    pub date: NaiveDate,
    pub sender: String,
    pub recipient: String,
    pub courier: Option<String>,
    pub tracking_number: Option<String>,
    pub item_type: Option<String>,
    pub received_by: String,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailOut {
    pub date: NaiveDate,
    pub sender: String,
    pub recipient: String,
    pub courier: Option<String>,
    pub tracking_number: Option<String>,
    pub item_type: Option<String>,
    pub dispatched_by: String,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentReport {
    pub incident_date: NaiveDate,
    pub incident_time: Option<String>,
    pub location: String,
    pub category: String,
    pub severity: Option<String>,
    pub description: String,
    pub persons_involved: Option<String>,
    pub action_taken: Option<String>,
    pub reported_by: String,
}

/// Bunker fuel or fresh water delivery to a vessel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BunkerWaterReport {
    pub date: NaiveDate,
    pub vessel_name: String,
    pub product: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub supplier: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub officer_on_duty: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelTankerReport {
    pub date: NaiveDate,
    pub truck_number: String,
    pub driver_name: String,
    pub company: Option<String>,
    pub product: Option<String>,
    pub quantity: Option<f64>,
    pub seal_number: Option<String>,
    pub time_in: Option<String>,
    pub time_out: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformerBlowerReport {
    pub date: NaiveDate,
    pub equipment_tag: String,
    pub location: Option<String>,
    pub status: String,
    pub temperature: Option<f64>,
    pub checked_by: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MooringReport {
    pub date: NaiveDate,
    pub vessel_name: String,
    pub berth: String,
    pub operation: String,
    pub tug_name: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub line_handlers: Option<String>,
    pub remarks: Option<String>,
}

/// Typed field set of one record, one variant per table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecordFields {
    GoodsIn(GoodsIn),
    GoodsOut(GoodsOut),
    PeopleIn(PeopleIn),
    PeopleOut(PeopleOut),
    MailIn(MailIn),
    MailOut(MailOut),
    IncidentReport(IncidentReport),
    BunkerWaterReport(BunkerWaterReport),
    FuelTankerReport(FuelTankerReport),
    TransformerBlowerReport(TransformerBlowerReport),
    MooringReport(MooringReport),
}

fn parse<T: serde::de::DeserializeOwned>(table: RecordTable, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::Validation(format!("{table}: {e}")))
}

impl RecordFields {
    #[must_use]
    pub fn table(&self) -> RecordTable {
        match self {
            RecordFields::GoodsIn(_) => RecordTable::GoodsIn,
            RecordFields::GoodsOut(_) => RecordTable::GoodsOut,
            RecordFields::PeopleIn(_) => RecordTable::PeopleIn,
            RecordFields::PeopleOut(_) => RecordTable::PeopleOut,
            RecordFields::MailIn(_) => RecordTable::MailIn,
            RecordFields::MailOut(_) => RecordTable::MailOut,
            RecordFields::IncidentReport(_) => RecordTable::IncidentReport,
            RecordFields::BunkerWaterReport(_) => RecordTable::BunkerWaterReport,
            RecordFields::FuelTankerReport(_) => RecordTable::FuelTankerReport,
            RecordFields::TransformerBlowerReport(_) => RecordTable::TransformerBlowerReport,
            RecordFields::MooringReport(_) => RecordTable::MooringReport,
        }
    }

    /// Parses submitted or stored fields for `table`. Keys outside the table's
    /// columns are ignored; missing required fields are a validation error.
    pub fn from_json(table: RecordTable, value: Value) -> Result<Self> {
        let fields = match table {
            RecordTable::GoodsIn => RecordFields::GoodsIn(parse(table, value)?),
            RecordTable::GoodsOut => RecordFields::GoodsOut(parse(table, value)?),
            RecordTable::PeopleIn => RecordFields::PeopleIn(parse(table, value)?),
            RecordTable::PeopleOut => RecordFields::PeopleOut(parse(table, value)?),
            RecordTable::MailIn => RecordFields::MailIn(parse(table, value)?),
            RecordTable::MailOut => RecordFields::MailOut(parse(table, value)?),
            RecordTable::IncidentReport => RecordFields::IncidentReport(parse(table, value)?),
            RecordTable::BunkerWaterReport => {
                RecordFields::BunkerWaterReport(parse(table, value)?)
            }
            RecordTable::FuelTankerReport => RecordFields::FuelTankerReport(parse(table, value)?),
            RecordTable::TransformerBlowerReport => {
                RecordFields::TransformerBlowerReport(parse(table, value)?)
            }
            RecordTable::MooringReport => RecordFields::MooringReport(parse(table, value)?),
        };
        fields.validate()?;
        Ok(fields)
    }

    /// Column/value map in the table's column order.
    pub fn to_columns(&self) -> Result<Map<String, Value>> {
        let value = serde_json::to_value(self)
            .map_err(|e| Error::Validation(format!("{}: {e}", self.table())))?;
        let Value::Object(mut object) = value else {
            return Err(Error::Validation(format!(
                "{}: fields did not serialize to an object",
                self.table()
            )));
        };

        let mut columns = Map::new();
        for column in self.table().columns() {
            let value = object.remove(*column).unwrap_or(Value::Null);
            columns.insert((*column).to_string(), value);
        }
        Ok(columns)
    }

    /// Rejects blank required text.
    pub fn validate(&self) -> Result<()> {
        let columns = self.to_columns()?;
        for required in self.table().required_columns() {
            match columns.get(*required) {
                Some(Value::String(s)) if !s.trim().is_empty() => {}
                Some(Value::String(_)) | Some(Value::Null) | None => {
                    return Err(Error::Validation(format!("{required} is required")));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn minimal(table: RecordTable) -> Value {
        let mut object = Map::new();
        for column in table.columns() {
            object.insert((*column).to_string(), Value::Null);
        }
        for column in table.required_columns() {
            let value = if *column == table.date_column() {
                json!("2025-01-15")
            } else {
                json!(format!("{column} value"))
            };
            object.insert((*column).to_string(), value);
        }
        Value::Object(object)
    }

    #[test]
    fn test_column_lists_match_typed_shapes() {
        for table in RecordTable::ALL {
            let fields = RecordFields::from_json(table, minimal(table)).unwrap();
            assert_eq!(fields.table(), table);

            let keys: Vec<String> = fields.to_columns().unwrap().keys().cloned().collect();
            let expected: Vec<String> = table.columns().iter().map(|c| c.to_string()).collect();
            assert_eq!(keys, expected, "{table}");

            let serialized = serde_json::to_value(&fields).unwrap();
            assert_eq!(serialized.as_object().unwrap().len(), table.columns().len(), "{table}");
        }
    }

    #[test]
    fn test_missing_required_field_is_validation_error() {
        let result = RecordFields::from_json(
            RecordTable::GoodsIn,
            json!({"date": "2025-01-15", "supplier": "Acme", "received_by": "guard"}),
        );
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_blank_required_field_is_validation_error() {
        let result = RecordFields::from_json(
            RecordTable::PeopleOut,
            json!({"date": "2025-01-15", "name": "   "}),
        );
        assert!(matches!(result, Err(Error::Validation(msg)) if msg == "name is required"));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let fields = RecordFields::from_json(
            RecordTable::PeopleOut,
            json!({"date": "2025-01-15", "name": "Jane", "business_unit": "tst"}),
        )
        .unwrap();
        assert!(!fields.to_columns().unwrap().contains_key("business_unit"));
    }

    #[test]
    fn test_integer_quantity_reads_as_float() {
        let fields = RecordFields::from_json(
            RecordTable::GoodsIn,
            json!({
                "date": "2025-01-15",
                "supplier": "Acme",
                "description": "pallets",
                "quantity": 12,
                "received_by": "guard"
            }),
        )
        .unwrap();
        let RecordFields::GoodsIn(goods) = fields else {
            panic!("wrong variant");
        };
        assert_eq!(goods.quantity, Some(12.0));
    }
}
