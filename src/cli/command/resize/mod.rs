pub mod resize_command;
