//! Consultation entity
//!
//! Column names follow the consultation documents as the backend writes them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "consultations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_name = "_id", column_type = "Text")]
    pub id: String,

    #[sea_orm(column_name = "patientId", column_type = "Text")]
    pub patient_id: String,

    pub date: Option<DateTimeUtc>,

    #[sea_orm(column_type = "Text", nullable)]
    pub transcript: Option<String>,

    #[sea_orm(column_name = "aiSummary", column_type = "Text", nullable)]
    pub ai_summary: Option<String>,

    /// Structured prescription map as written by the prescription upload flow
    #[sea_orm(column_name = "prescriptionData", column_type = "JsonBinary", nullable)]
    pub prescription_data: Option<Json>,

    #[sea_orm(column_name = "doctorNotes", column_type = "Text", nullable)]
    pub doctor_notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::patient::Entity",
        from = "Column::PatientId",
        to = "super::patient::Column::Id"
    )]
    Patient,
}

impl Related<super::patient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Patient.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
