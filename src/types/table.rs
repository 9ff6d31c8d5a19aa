use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The record tables personnel can write to and browse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordTable {
    GoodsIn,
    GoodsOut,
    PeopleIn,
    PeopleOut,
    MailIn,
    MailOut,
    #[serde(rename = "incident_reports")]
    IncidentReport,
    #[serde(rename = "bunker_water_reports")]
    BunkerWaterReport,
    #[serde(rename = "fuel_tanker_reports")]
    FuelTankerReport,
    #[serde(rename = "transformer_blower_reports")]
    TransformerBlowerReport,
    #[serde(rename = "mooring_reports")]
    MooringReport,
}

impl RecordTable {
    pub const ALL: [RecordTable; 11] = [
        RecordTable::GoodsIn,
        RecordTable::GoodsOut,
        RecordTable::PeopleIn,
        RecordTable::PeopleOut,
        RecordTable::MailIn,
        RecordTable::MailOut,
        RecordTable::IncidentReport,
        RecordTable::BunkerWaterReport,
        RecordTable::FuelTankerReport,
        RecordTable::TransformerBlowerReport,
        RecordTable::MooringReport,
    ];

    /// SQL table name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            RecordTable::GoodsIn => "goods_in",
            RecordTable::GoodsOut => "goods_out",
            RecordTable::PeopleIn => "people_in",
            RecordTable::PeopleOut => "people_out",
            RecordTable::MailIn => "mail_in",
            RecordTable::MailOut => "mail_out",
            RecordTable::IncidentReport => "incident_reports",
            RecordTable::BunkerWaterReport => "bunker_water_reports",
            RecordTable::FuelTankerReport => "fuel_tanker_reports",
            RecordTable::TransformerBlowerReport => "transformer_blower_reports",
            RecordTable::MooringReport => "mooring_reports",
        }
    }

    /// Prefix of the human-readable ID, e.g. `BGP-IN` in `BGP-IN-AB12CD`.
    #[must_use]
    pub const fn id_prefix(self) -> &'static str {
        match self {
            RecordTable::GoodsIn => "BGP-IN",
            RecordTable::GoodsOut => "BGP-OUT",
            RecordTable::PeopleIn => "PPL-IN",
            RecordTable::PeopleOut => "PPL-OUT",
            RecordTable::MailIn => "MAIL-IN",
            RecordTable::MailOut => "MAIL-OUT",
            RecordTable::IncidentReport => "INC",
            RecordTable::BunkerWaterReport => "BWR",
            RecordTable::FuelTankerReport => "FTT",
            RecordTable::TransformerBlowerReport => "TBR",
            RecordTable::MooringReport => "MOR",
        }
    }

    /// Whether rows carry a `business_unit` and listings are scoped by it.
    /// The operational logs are shared across units.
    #[must_use]
    pub const fn is_scoped(self) -> bool {
        !matches!(
            self,
            RecordTable::BunkerWaterReport
                | RecordTable::FuelTankerReport
                | RecordTable::TransformerBlowerReport
                | RecordTable::MooringReport
        )
    }

    /// Column the date range filter applies to.
    #[must_use]
    pub const fn date_column(self) -> &'static str {
        match self {
            RecordTable::IncidentReport => "incident_date",
            _ => "date",
        }
    }

    /// Text columns searched (OR-ed, case-insensitive substring) by free-text search.
    #[must_use]
    pub const fn search_columns(self) -> &'static [&'static str] {
        match self {
            RecordTable::GoodsIn => &[
                "formatted_id",
                "supplier",
                "description",
                "vehicle_number",
                "received_by",
            ],
            RecordTable::GoodsOut => &[
                "formatted_id",
                "recipient",
                "description",
                "vehicle_number",
                "released_by",
            ],
            RecordTable::PeopleIn => &["formatted_id", "name", "company", "id_number", "host"],
            RecordTable::PeopleOut => &["formatted_id", "name", "company", "id_number"],
            RecordTable::MailIn => &[
                "formatted_id",
                "sender",
                "recipient",
                "courier",
                "tracking_number",
            ],
            RecordTable::MailOut => &[
                "formatted_id",
                "sender",
                "recipient",
                "courier",
                "tracking_number",
            ],
            RecordTable::IncidentReport => &[
                "formatted_id",
                "location",
                "category",
                "description",
                "reported_by",
            ],
            RecordTable::BunkerWaterReport => &["formatted_id", "vessel_name", "product", "supplier"],
            RecordTable::FuelTankerReport => &[
                "formatted_id",
                "truck_number",
                "driver_name",
                "company",
            ],
            RecordTable::TransformerBlowerReport => &[
                "formatted_id",
                "equipment_tag",
                "location",
                "status",
            ],
            RecordTable::MooringReport => &["formatted_id", "vessel_name", "berth", "tug_name"],
        }
    }

    /// Table-specific columns, in storage order. Common metadata columns
    /// (id, formatted_id, created_at, created_by, business_unit) are not listed.
    #[must_use]
    pub const fn columns(self) -> &'static [&'static str] {
        match self {
            RecordTable::GoodsIn => &[
                "date",
                "time",
                "supplier",
                "description",
                "quantity",
                "unit",
                "vehicle_number",
                "driver_name",
                "received_by",
                "remarks",
            ],
            RecordTable::GoodsOut => &[
                "date",
                "time",
                "recipient",
                "description",
                "quantity",
                "unit",
                "vehicle_number",
                "driver_name",
                "released_by",
                "authorized_by",
                "remarks",
            ],
            RecordTable::PeopleIn => &[
                "date",
                "time_in",
                "name",
                "company",
                "id_number",
                "purpose",
                "host",
                "badge_number",
                "remarks",
            ],
            RecordTable::PeopleOut => &[
                "date",
                "time_out",
                "name",
                "company",
                "id_number",
                "badge_number",
                "remarks",
            ],
            RecordTable::MailIn => &[
                "date",
                "sender",
                "recipient",
                "courier",
                "tracking_number",
                "item_type",
                "received_by",
                "remarks",
            ],
            RecordTable::MailOut => &[
                "date",
                "sender",
                "recipient",
                "courier",
                "tracking_number",
                "item_type",
                "dispatched_by",
                "remarks",
            ],
            RecordTable::IncidentReport => &[
                "incident_date",
                "incident_time",
                "location",
                "category",
                "severity",
                "description",
                "persons_involved",
                "action_taken",
                "reported_by",
            ],
            RecordTable::BunkerWaterReport => &[
                "date",
                "vessel_name",
                "product",
                "quantity",
                "unit",
                "supplier",
                "start_time",
                "end_time",
                "officer_on_duty",
                "remarks",
            ],
            RecordTable::FuelTankerReport => &[
                "date",
                "truck_number",
                "driver_name",
                "company",
                "product",
                "quantity",
                "seal_number",
                "time_in",
                "time_out",
                "remarks",
            ],
            RecordTable::TransformerBlowerReport => &[
                "date",
                "equipment_tag",
                "location",
                "status",
                "temperature",
                "checked_by",
                "remarks",
            ],
            RecordTable::MooringReport => &[
                "date",
                "vessel_name",
                "berth",
                "operation",
                "tug_name",
                "start_time",
                "end_time",
                "line_handlers",
                "remarks",
            ],
        }
    }

    /// Text columns that must be present and non-blank on every write.
    #[must_use]
    pub const fn required_columns(self) -> &'static [&'static str] {
        match self {
            RecordTable::GoodsIn => &["date", "supplier", "description", "received_by"],
            RecordTable::GoodsOut => &["date", "recipient", "description", "released_by"],
            RecordTable::PeopleIn => &["date", "name", "purpose"],
            RecordTable::PeopleOut => &["date", "name"],
            RecordTable::MailIn => &["date", "sender", "recipient", "received_by"],
            RecordTable::MailOut => &["date", "sender", "recipient", "dispatched_by"],
            RecordTable::IncidentReport => &[
                "incident_date",
                "location",
                "category",
                "description",
                "reported_by",
            ],
            RecordTable::BunkerWaterReport => &["date", "vessel_name", "product"],
            RecordTable::FuelTankerReport => &["date", "truck_number", "driver_name"],
            RecordTable::TransformerBlowerReport => &["date", "equipment_tag", "status"],
            RecordTable::MooringReport => &["date", "vessel_name", "berth", "operation"],
        }
    }
}

impl fmt::Display for RecordTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RecordTable {
    type Err = Error;

    /// Accepts the table name, the singular of a `*_reports` name
    /// (`incident_report`), and kebab-case forms of either (`goods-in`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        RecordTable::ALL
            .into_iter()
            .find(|t| {
                t.name() == normalized
                    || t.name()
                        .strip_suffix("_reports")
                        .is_some_and(|stem| normalized.strip_suffix("_report") == Some(stem))
            })
            .ok_or_else(|| Error::BadRequest(format!("unknown record table '{s}'")))
    }
}
