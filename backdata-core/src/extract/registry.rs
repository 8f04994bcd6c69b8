//! Extractor registry: one extractor per configured job

use super::SheetExtractor;
use super::competitor::CompetitorExtractor;
use super::group_sales::GroupSalesExtractor;
use super::performance::PerformanceExtractor;
use super::table::TableExtractor;
use crate::config::{ExportConfig, JobConfig, JobKind};

/// Create extractors for every job, in configuration order
pub fn create_extractors(config: &ExportConfig) -> Vec<Box<dyn SheetExtractor>> {
    config.jobs.iter().map(create_extractor).collect()
}

pub fn create_extractor(job: &JobConfig) -> Box<dyn SheetExtractor> {
    let (name, sheet, output) = (job.name.as_str(), job.sheet.as_str(), job.output.as_str());
    match &job.kind {
        JobKind::Table(table) => Box::new(TableExtractor::new(name, sheet, output, table)),
        JobKind::Competitor(competitor) => {
            Box::new(CompetitorExtractor::new(name, sheet, output, competitor))
        }
        JobKind::GroupSales(group) => Box::new(GroupSalesExtractor::new(name, sheet, output, group)),
        JobKind::Performance(performance) => {
            Box::new(PerformanceExtractor::new(name, sheet, output, performance))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extractors_follow_job_order() {
        let config = ExportConfig::default();
        let extractors = create_extractors(&config);

        assert_eq!(extractors.len(), config.jobs.len());
        for (extractor, job) in extractors.iter().zip(&config.jobs) {
            assert_eq!(extractor.name(), job.name);
            assert_eq!(extractor.sheet(), job.sheet);
            assert_eq!(extractor.kind(), job.kind.label());
        }
    }
}
