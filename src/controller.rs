pub mod controller_handler;


pub use controller_handler::Controller;
