use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// JDBC-style SQL type code carried by columns and procedure parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum SqlType {
    Bit,
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Float,
    Double,
    Numeric,
    Decimal,
    Char,
    Varchar,
    LongVarchar,
    NChar,
    NVarchar,
    Clob,
    Date,
    Time,
    Timestamp,
    Binary,
    VarBinary,
    LongVarBinary,
    Blob,
    Other,
}

impl SqlType {
    /// Whether a declared max length is meaningful for this type.
    ///
    /// Covers the character, binary and time families; for every other type a
    /// length difference between two columns is noise.
    pub fn supports_length(self) -> bool {
        matches!(
            self,
            SqlType::Char
                | SqlType::Varchar
                | SqlType::LongVarchar
                | SqlType::NChar
                | SqlType::NVarchar
                | SqlType::Binary
                | SqlType::VarBinary
                | SqlType::LongVarBinary
                | SqlType::Time
                | SqlType::Timestamp
        )
    }

    /// `DECIMAL` and `NUMERIC` are interchangeable across vendors.
    pub fn is_decimal(self) -> bool {
        matches!(self, SqlType::Decimal | SqlType::Numeric)
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            SqlType::TinyInt | SqlType::SmallInt | SqlType::Integer | SqlType::BigInt
        )
    }

    /// Returns true when both codes describe the same storage family.
    pub fn same_family(self, other: SqlType) -> bool {
        self == other || (self.is_decimal() && other.is_decimal())
    }

    /// Canonical SQL keyword for the type.
    pub fn sql_name(self) -> &'static str {
        match self {
            SqlType::Bit => "BIT",
            SqlType::Boolean => "BOOLEAN",
            SqlType::TinyInt => "TINYINT",
            SqlType::SmallInt => "SMALLINT",
            SqlType::Integer => "INTEGER",
            SqlType::BigInt => "BIGINT",
            SqlType::Real => "REAL",
            SqlType::Float => "FLOAT",
            SqlType::Double => "DOUBLE",
            SqlType::Numeric => "NUMERIC",
            SqlType::Decimal => "DECIMAL",
            SqlType::Char => "CHAR",
            SqlType::Varchar => "VARCHAR",
            SqlType::LongVarchar => "LONGVARCHAR",
            SqlType::NChar => "NCHAR",
            SqlType::NVarchar => "NVARCHAR",
            SqlType::Clob => "CLOB",
            SqlType::Date => "DATE",
            SqlType::Time => "TIME",
            SqlType::Timestamp => "TIMESTAMP",
            SqlType::Binary => "BINARY",
            SqlType::VarBinary => "VARBINARY",
            SqlType::LongVarBinary => "LONGVARBINARY",
            SqlType::Blob => "BLOB",
            SqlType::Other => "OTHER",
        }
    }

    /// Property type used when a column is mapped onto an object attribute.
    pub fn value_type(self) -> &'static str {
        match self {
            SqlType::Bit | SqlType::Boolean => "bool",
            SqlType::TinyInt => "i8",
            SqlType::SmallInt => "i16",
            SqlType::Integer => "i32",
            SqlType::BigInt => "i64",
            SqlType::Real => "f32",
            SqlType::Float | SqlType::Double => "f64",
            SqlType::Numeric | SqlType::Decimal => "Decimal",
            SqlType::Char
            | SqlType::Varchar
            | SqlType::LongVarchar
            | SqlType::NChar
            | SqlType::NVarchar
            | SqlType::Clob => "String",
            SqlType::Date => "NaiveDate",
            SqlType::Time => "NaiveTime",
            SqlType::Timestamp => "NaiveDateTime",
            SqlType::Binary | SqlType::VarBinary | SqlType::LongVarBinary | SqlType::Blob => {
                "Vec<u8>"
            }
            SqlType::Other => "Value",
        }
    }
}

/// Direction of a stored procedure parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ParameterDirection {
    In,
    Out,
    InOut,
    /// Return value slot of a function-style procedure.
    Void,
}
