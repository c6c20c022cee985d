pub mod canyons;
pub mod crown_road_sales;
pub mod hazard_reduction_burns;
pub mod naming_proposals;
pub mod scalar;
pub mod stream_heights;

use crate::constants;
use crate::types::DatasetJob;

/// Look up a job by its command-line name
pub fn create_job(job_name: &str) -> Option<Box<dyn DatasetJob>> {
    match job_name {
        constants::CROWN_ROAD_SALES_JOB => Some(Box::new(crown_road_sales::CrownRoadSalesJob::new())),
        constants::NAMING_PROPOSALS_JOB => Some(Box::new(naming_proposals::NamingProposalsJob::new())),
        constants::HAZARD_REDUCTION_BURNS_JOB => {
            Some(Box::new(hazard_reduction_burns::HazardReductionBurnsJob::new()))
        }
        constants::CANYONS_JOB => Some(Box::new(canyons::CanyonsJob::new())),
        constants::STREAM_HEIGHTS_JOB => Some(Box::new(stream_heights::StreamHeightsJob::new())),
        _ => None,
    }
}
