mod display;

pub use display::{print_answer, print_error, print_header, print_info, print_prompt, print_success};
