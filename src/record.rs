//! Row and record types flowing through the pipeline.
//!
//! ```text
//! RawRow ──normalize──▶ VoterRow ──merge──▶ LogicalRecord ──assemble──▶ ExportRecord
//! (ragged cells)        (15 fields)          (one voter)                 (export schema)
//! ```

use serde::{Deserialize, Serialize};

/// Number of columns in an electoral-roll table.
pub const COLUMN_COUNT: usize = 15;

/// One physical table row as produced by an extractor.
///
/// Cells are in left-to-right order; `None` is a cell the extractor knows
/// exists but could not read. Rows may be shorter or longer than
/// [`COLUMN_COUNT`].
pub type RawRow = Vec<Option<String>>;

/// The 15 named columns of the source table, in source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Ac,
    Part,
    Sl,
    HouseNo,
    Secn,
    Name,
    Last,
    RelType,
    RelName,
    RelLast,
    IdCard,
    Link,
    Sex,
    Age,
    HouseName,
}

impl Field {
    /// All columns in source order.
    pub const ALL: [Field; COLUMN_COUNT] = [
        Field::Ac,
        Field::Part,
        Field::Sl,
        Field::HouseNo,
        Field::Secn,
        Field::Name,
        Field::Last,
        Field::RelType,
        Field::RelName,
        Field::RelLast,
        Field::IdCard,
        Field::Link,
        Field::Sex,
        Field::Age,
        Field::HouseName,
    ];

    /// Text columns decoded through the oracle, one decode call each.
    pub const DECODED: [Field; 5] = [
        Field::Name,
        Field::RelType,
        Field::RelName,
        Field::RelLast,
        Field::HouseName,
    ];

    /// Columns that absorb the text of a continuation row.
    pub const CONTINUED: [Field; 4] = [
        Field::Name,
        Field::RelName,
        Field::RelLast,
        Field::HouseName,
    ];

    /// Short column name as used in source tables.
    pub fn label(self) -> &'static str {
        match self {
            Field::Ac => "AC",
            Field::Part => "Part",
            Field::Sl => "SL",
            Field::HouseNo => "HouseNo",
            Field::Secn => "Secn",
            Field::Name => "Name",
            Field::Last => "Last",
            Field::RelType => "RelType",
            Field::RelName => "RelName",
            Field::RelLast => "RelLast",
            Field::IdCard => "IDCard",
            Field::Link => "Link",
            Field::Sex => "Sex",
            Field::Age => "Age",
            Field::HouseName => "HouseName",
        }
    }

    /// Column header in the export schema.
    pub fn export_header(self) -> &'static str {
        match self {
            Field::Ac => "AC CODE",
            Field::Part => "PART CODE",
            Field::Sl => "SL NO",
            Field::HouseNo => "HOUSE NO",
            Field::Secn => "SECN CODE",
            Field::Name => "FIRST NAME",
            Field::Last => "LAST NAME",
            Field::RelType => "RELATION TYPE",
            Field::RelName => "RELATION FIRST NAME",
            Field::RelLast => "RELATION LAST NAME",
            Field::IdCard => "ID CARD NO",
            Field::Link => "PART LINK NO",
            Field::Sex => "SEX",
            Field::Age => "AGE",
            Field::HouseName => "HOUSE NAME",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A row with exactly one string per column.
///
/// Produced by the normalizer; after merging, each value represents one
/// voter (see [`LogicalRecord`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterRow {
    pub ac: String,
    pub part: String,
    pub sl: String,
    pub house_no: String,
    pub secn: String,
    pub name: String,
    pub last: String,
    pub rel_type: String,
    pub rel_name: String,
    pub rel_last: String,
    pub id_card: String,
    pub link: String,
    pub sex: String,
    pub age: String,
    pub house_name: String,
}

/// A [`VoterRow`] known to describe a single voter, continuation rows
/// already folded in.
pub type LogicalRecord = VoterRow;

impl VoterRow {
    /// Build a row from exactly [`COLUMN_COUNT`] cells in source order.
    pub fn from_cells(cells: [String; COLUMN_COUNT]) -> Self {
        let [ac, part, sl, house_no, secn, name, last, rel_type, rel_name, rel_last, id_card, link, sex, age, house_name] =
            cells;
        Self {
            ac,
            part,
            sl,
            house_no,
            secn,
            name,
            last,
            rel_type,
            rel_name,
            rel_last,
            id_card,
            link,
            sex,
            age,
            house_name,
        }
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Ac => &self.ac,
            Field::Part => &self.part,
            Field::Sl => &self.sl,
            Field::HouseNo => &self.house_no,
            Field::Secn => &self.secn,
            Field::Name => &self.name,
            Field::Last => &self.last,
            Field::RelType => &self.rel_type,
            Field::RelName => &self.rel_name,
            Field::RelLast => &self.rel_last,
            Field::IdCard => &self.id_card,
            Field::Link => &self.link,
            Field::Sex => &self.sex,
            Field::Age => &self.age,
            Field::HouseName => &self.house_name,
        }
    }

    pub fn get_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Ac => &mut self.ac,
            Field::Part => &mut self.part,
            Field::Sl => &mut self.sl,
            Field::HouseNo => &mut self.house_no,
            Field::Secn => &mut self.secn,
            Field::Name => &mut self.name,
            Field::Last => &mut self.last,
            Field::RelType => &mut self.rel_type,
            Field::RelName => &mut self.rel_name,
            Field::RelLast => &mut self.rel_last,
            Field::IdCard => &mut self.id_card,
            Field::Link => &mut self.link,
            Field::Sex => &mut self.sex,
            Field::Age => &mut self.age,
            Field::HouseName => &mut self.house_name,
        }
    }

    /// Cells in source order.
    pub fn cells(&self) -> [&str; COLUMN_COUNT] {
        Field::ALL.map(|f| self.get(f))
    }
}

/// A decoded voter in the export schema.
///
/// Field order matches the export column order, which is also the CSV and
/// JSON key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    #[serde(rename = "AC CODE")]
    pub ac_code: String,
    #[serde(rename = "PART CODE")]
    pub part_code: String,
    /// 1-based position in the final dataset; not the source SL.
    #[serde(rename = "SL NO")]
    pub sl_no: usize,
    #[serde(rename = "HOUSE NO")]
    pub house_no: String,
    #[serde(rename = "SECN CODE")]
    pub secn_code: String,
    #[serde(rename = "FIRST NAME")]
    pub first_name: String,
    #[serde(rename = "LAST NAME")]
    pub last_name: String,
    #[serde(rename = "RELATION TYPE")]
    pub relation_type: String,
    #[serde(rename = "RELATION FIRST NAME")]
    pub relation_first_name: String,
    #[serde(rename = "RELATION LAST NAME")]
    pub relation_last_name: String,
    #[serde(rename = "ID CARD NO")]
    pub id_card_no: String,
    #[serde(rename = "PART LINK NO")]
    pub part_link_no: String,
    #[serde(rename = "SEX")]
    pub sex: String,
    #[serde(rename = "AGE")]
    pub age: String,
    #[serde(rename = "HOUSE NAME")]
    pub house_name: String,
}

impl ExportRecord {
    /// Export headers in column order.
    pub fn headers() -> [&'static str; COLUMN_COUNT] {
        Field::ALL.map(Field::export_header)
    }

    /// Values in export column order, `SL NO` rendered as decimal.
    pub fn values(&self) -> [String; COLUMN_COUNT] {
        [
            self.ac_code.clone(),
            self.part_code.clone(),
            self.sl_no.to_string(),
            self.house_no.clone(),
            self.secn_code.clone(),
            self.first_name.clone(),
            self.last_name.clone(),
            self.relation_type.clone(),
            self.relation_first_name.clone(),
            self.relation_last_name.clone(),
            self.id_card_no.clone(),
            self.part_link_no.clone(),
            self.sex.clone(),
            self.age.clone(),
            self.house_name.clone(),
        ]
    }
}
