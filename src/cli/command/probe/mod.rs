pub mod probe_command;
