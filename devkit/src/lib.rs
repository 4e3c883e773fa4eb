/*!
# Machine Health DevKit - Harness et fixtures de test

Facilite l'écriture de tests bout-en-bout avec:
- Un kernel réel sur port éphémère, persistance dans un dossier temporaire
- Des builders de soumissions (machines + relevés)
*/

pub mod fixtures;
pub mod test_utils;

pub use fixtures::{distinct_submissions, SubmissionBuilder};
pub use test_utils::TestHarness;
