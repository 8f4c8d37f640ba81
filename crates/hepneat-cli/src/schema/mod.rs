pub mod score_report;
