mod category_picker;
mod command_input;
mod confirm;
mod input;
mod key_result;

pub use category_picker::{CategoryPicker, CategoryPickerEvent};
pub use command_input::{CommandEvent, CommandInput};
pub use confirm::{ConfirmDialog, ConfirmEvent};
pub use input::{InputResult, TextInput};
pub use key_result::KeyResult;
