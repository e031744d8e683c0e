pub mod error;
pub mod exposure;
pub mod extract;
pub mod fields;
pub mod model;
pub mod numeric;
pub mod prompt;
pub mod resolve;
pub mod sections;
pub mod shift;

pub use error::ExtractError;
pub use extract::{extract, Extractor};
pub use fields::Field;
pub use model::{
    Article, ParsedAnswer, Persona, Rating, Stance, StructuredRecord, SurveyEntry, UserId,
};
pub use shift::{calculate_shifts, Shift};
