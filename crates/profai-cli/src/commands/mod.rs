pub mod grade;
pub mod lessons;
pub mod run;
