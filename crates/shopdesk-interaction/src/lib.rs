pub mod openai;
pub mod webdriver;

pub use openai::{
    AssistantsReplyGenerator, ChatCompletionReplyGenerator, build_reply_generator, strip_citations,
};
pub use webdriver::{WebDriverLauncher, WebDriverSession};
