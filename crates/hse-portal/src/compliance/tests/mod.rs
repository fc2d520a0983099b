mod common;
mod exams;
mod instructions;
