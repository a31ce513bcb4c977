//! SeaORM entity models
//!
//! Store entities read by the record extractor

mod consultation;
mod patient;

pub use consultation::{
    Entity as ConsultationEntity,
    Model as Consultation,
    Column as ConsultationColumn,
};

pub use patient::{
    Entity as PatientEntity,
    Model as Patient,
};
