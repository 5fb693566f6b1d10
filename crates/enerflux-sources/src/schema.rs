use polars::prelude::{DataFrame, DataType};

use crate::errors::SchemaError;

pub const ID: &str = "ID";
pub const NOM: &str = "Nom";
pub const PRENOM: &str = "Prenom";
pub const ADRESSE: &str = "Adresse";
pub const CSP: &str = "CSP";

pub const ID_ADR: &str = "ID_Adr";
pub const N: &str = "N";
pub const NOM_RUE: &str = "Nom_Rue";
pub const CODE_POSTAL: &str = "Code_Postal";
pub const NB_KW_JOUR: &str = "NB_KW_Jour";

pub const ID_CSP: &str = "ID_CSP";
pub const DESC: &str = "Desc";
pub const SALAIRE_MOYEN: &str = "Salaire_Moyen";
pub const SALAIRE_MIN: &str = "Salaire_Min";
pub const SALAIRE_MAX: &str = "Salaire_Max";

pub const ID_RUE: &str = "ID_Rue";
pub const ID_VILLE: &str = "ID_Ville";
pub const ID_IRIS: &str = "ID_Iris";

pub const SOURCE: &str = "Source";
pub const ID_SOURCE: &str = "ID_Source";

pub const CONSO_MOYENNE_ANNUELLE: &str = "Conso_moyenne_annuelle";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Float,
}

impl ColumnType {
    pub fn dtype(&self) -> DataType {
        match self {
            ColumnType::Text => DataType::String,
            ColumnType::Float => DataType::Float64,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnType,
    pub required: bool,
}

const fn text(name: &'static str, required: bool) -> ColumnSpec {
    ColumnSpec {
        name,
        kind: ColumnType::Text,
        required,
    }
}

const fn float(name: &'static str, required: bool) -> ColumnSpec {
    ColumnSpec {
        name,
        kind: ColumnType::Float,
        required,
    }
}

#[derive(Debug)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [ColumnSpec],
    pub primary_key: &'static [&'static str],
}

impl TableSchema {
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|spec| spec.name).collect()
    }

    pub fn required_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|spec| spec.required)
    }

    /// Checks that every required column is present and that every schema column the frame
    /// carries has the declared dtype. Columns outside the schema are ignored.
    pub fn validate(&self, df: &DataFrame) -> Result<(), SchemaError> {
        let missing: Vec<&'static str> = self
            .required_columns()
            .filter(|spec| df.column(spec.name).is_err())
            .map(|spec| spec.name)
            .collect();

        if !missing.is_empty() {
            return Err(SchemaError::MissingColumns {
                table: self.name,
                columns: missing,
            });
        }

        for spec in self.columns {
            let Ok(column) = df.column(spec.name) else {
                continue;
            };
            let expected = spec.kind.dtype();
            let found = column.dtype();
            // An all-null column built without type information is acceptable.
            if *found != expected && *found != DataType::Null {
                return Err(SchemaError::TypeMismatch {
                    table: self.name,
                    column: spec.name,
                    expected: expected.to_string(),
                    found: found.to_string(),
                });
            }
        }

        Ok(())
    }
}

pub static POPULATION: TableSchema = TableSchema {
    name: "Population",
    columns: &[
        text(ID, true),
        text(NOM, false),
        text(PRENOM, false),
        text(ADRESSE, true),
        text(CSP, true),
    ],
    primary_key: &[ID],
};

pub static CONSOMMATION: TableSchema = TableSchema {
    name: "Consommation",
    columns: &[
        text(ID_ADR, true),
        text(N, true),
        text(NOM_RUE, true),
        text(CODE_POSTAL, true),
        float(NB_KW_JOUR, true),
    ],
    primary_key: &[ID_ADR],
};

pub static CSP_REFERENCE: TableSchema = TableSchema {
    name: "CSP",
    columns: &[
        text(ID_CSP, true),
        text(DESC, false),
        float(SALAIRE_MOYEN, true),
        float(SALAIRE_MIN, false),
        float(SALAIRE_MAX, false),
    ],
    primary_key: &[ID_CSP],
};

pub static IRIS_REFERENCE: TableSchema = TableSchema {
    name: "IRIS",
    columns: &[text(ID_RUE, true), text(ID_VILLE, true), text(ID_IRIS, true)],
    primary_key: &[ID_RUE, ID_VILLE],
};

pub static POPULATION_UNION: TableSchema = TableSchema {
    name: "Population_Union",
    columns: &[
        text(NOM, false),
        text(PRENOM, false),
        text(ADRESSE, true),
        text(CSP, true),
        text(SOURCE, true),
        text(ID_SOURCE, true),
    ],
    primary_key: &[ID_SOURCE],
};

pub static CONSOMMATION_UNION: TableSchema = TableSchema {
    name: "Consommation_Union",
    columns: &[
        text(N, true),
        text(NOM_RUE, true),
        text(CODE_POSTAL, true),
        float(NB_KW_JOUR, true),
        text(SOURCE, true),
        text(ID_SOURCE, true),
    ],
    primary_key: &[ID_SOURCE],
};

pub static CONSOMMATION_CSP: TableSchema = TableSchema {
    name: "Consommation_CSP",
    columns: &[
        text(ID_CSP, true),
        float(CONSO_MOYENNE_ANNUELLE, true),
        float(SALAIRE_MOYEN, true),
    ],
    primary_key: &[ID_CSP],
};

pub static CONSOMMATION_IRIS: TableSchema = TableSchema {
    name: "Consommation_IRIS",
    columns: &[text(ID_IRIS, true), float(CONSO_MOYENNE_ANNUELLE, true)],
    primary_key: &[ID_IRIS],
};
