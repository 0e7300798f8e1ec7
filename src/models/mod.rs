mod category;
mod forms;
mod progress;
mod search;

pub use category::Category;
pub use forms::{LoginForm, LoginQuery};
pub use progress::{ProgressRecord, TaskStatus};
pub use search::{SearchRequest, SearchContext, combine_keywords};
