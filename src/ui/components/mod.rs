mod command_input;
mod confirm;
mod form;
mod input;
mod key_result;
mod message_box;
mod page_list;

pub use command_input::{CommandEvent, CommandInput};
pub use confirm::{ConfirmDialog, ConfirmEvent};
pub use form::{Form, FormEvent};
pub use input::{InputResult, TextInput};
pub use key_result::KeyResult;
pub use message_box::{MessageBox, MessageEvent};
pub use page_list::{PageList, PageListEvent};
