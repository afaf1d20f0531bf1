pub mod panels;
pub mod shell;

pub use panels::{FormActions, FormInputs, FormView, StageSprite, StageView};
pub use shell::UiShell;
