// lib/src/filters.rs

//! List filters accepted by the admin and marketing listings. Each one
//! deserializes from a query string and turns into a storage `Query`.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use models::errors::{ValidationError, ValidationResult};
use models::labels::Labeled;
use models::medical::{AppointmentStatus, BloodType, Department, Gender, Specialty};
use models::DocumentId;

use crate::storage_engine::{Query, SortOrder};

pub const DEFAULT_PAGE_SIZE: usize = 25;
pub const MAX_PAGE_SIZE: usize = 100;

fn paginate(query: Query, offset: Option<usize>, limit: Option<usize>) -> Query {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    query.offset(offset.unwrap_or(0)).limit(limit)
}

fn enum_index<T: Labeled>(index: Option<u8>) -> ValidationResult<Option<u8>> {
    match index {
        Some(i) if T::from_index(i).is_none() => {
            Err(ValidationError::InvalidEnumIndex { kind: T::KIND, index: i })
        }
        other => Ok(other),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorFilter {
    pub specialty: Option<u8>,
    pub department: Option<u8>,
    pub search: Option<String>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl DoctorFilter {
    pub fn to_query(&self) -> ValidationResult<Query> {
        let mut query = Query::new().order_by("name", SortOrder::Asc);
        if let Some(specialty) = enum_index::<Specialty>(self.specialty)? {
            query = query.equal("specialty", specialty);
        }
        if let Some(department) = enum_index::<Department>(self.department)? {
            query = query.equal("department", department);
        }
        if let Some(text) = &self.search {
            query = query.search(&["name", "bio"], text);
        }
        Ok(paginate(query, self.offset, self.limit))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientFilter {
    pub search: Option<String>,
    pub gender: Option<u8>,
    pub blood_type: Option<u8>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl PatientFilter {
    pub fn to_query(&self) -> ValidationResult<Query> {
        let mut query = Query::new().order_by("last_name", SortOrder::Asc);
        if let Some(gender) = enum_index::<Gender>(self.gender)? {
            query = query.equal("gender", gender);
        }
        if let Some(blood_type) = enum_index::<BloodType>(self.blood_type)? {
            query = query.equal("blood_type", blood_type);
        }
        if let Some(text) = &self.search {
            query = query.search(&["first_name", "last_name", "email"], text);
        }
        Ok(paginate(query, self.offset, self.limit))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentFilter {
    pub patient_id: Option<DocumentId>,
    pub doctor_id: Option<DocumentId>,
    pub status: Option<u8>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl AppointmentFilter {
    pub fn to_query(&self) -> ValidationResult<Query> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(ValidationError::InvalidRange(format!(
                    "'from' {} is after 'to' {}",
                    from, to
                )));
            }
        }
        let mut query = Query::new().order_by("scheduled_at", SortOrder::Asc);
        if let Some(patient_id) = &self.patient_id {
            query = query.equal("patient_id", patient_id.as_str());
        }
        if let Some(doctor_id) = &self.doctor_id {
            query = query.equal("doctor_id", doctor_id.as_str());
        }
        if let Some(status) = enum_index::<AppointmentStatus>(self.status)? {
            query = query.equal("status", status);
        }
        query = query.range(
            "scheduled_at",
            self.from.map(|t| json!(t)),
            self.to.map(|t| json!(t)),
        );
        Ok(paginate(query, self.offset, self.limit))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckupFilter {
    pub search: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl CheckupFilter {
    pub fn to_query(&self) -> ValidationResult<Query> {
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(ValidationError::InvalidRange(format!(
                    "min_price {} exceeds max_price {}",
                    min, max
                )));
            }
        }
        let mut query = Query::new()
            .order_by("price_cents", SortOrder::Asc)
            .range(
                "price_cents",
                self.min_price.map(|p| json!(p)),
                self.max_price.map(|p| json!(p)),
            );
        if let Some(text) = &self.search {
            query = query.search(&["title", "hospital_name", "description"], text);
        }
        Ok(paginate(query, self.offset, self.limit))
    }
}
