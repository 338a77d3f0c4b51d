pub mod chat_loop;
pub mod lifecycle;
pub mod profile_form;
pub mod renderer;
pub mod setup;
pub mod state;
