//! # Statement Templates
//!
//! Target-language text for each block variant. The output must match what
//! the Arduino toolchain integration has always received, so these strings
//! are fixed, including the missing space in `digitalWrite(pin,value)`.
//!
//! Compound statements come in pieces that surround their bodies:
//!
//! ```text
//! program_open   <body> program_close
//! while_open     <body> body_close
//! if_open  <true body> else_open <false body> body_close
//! ```
//!
//! Every function takes the indent of the statement itself. Bodies are
//! indented one level deeper by the caller.

use crate::graph::PinLevel;

/// Start of the `setup()`/`loop()` skeleton, up to the loop body.
pub fn program_open(indent: &str) -> String {
    format!(
        "{indent}void setup() {{ pinMode(12, OUTPUT); }}\n\
         {indent}void loop()\n\
         {indent}{{\n"
    )
}

pub fn program_close(indent: &str) -> String {
    format!("\n{indent}}}\n")
}

pub fn while_open(indent: &str, condition: &str) -> String {
    format!("{indent}while ({condition})\n{indent}{{\n")
}

pub fn if_open(indent: &str, condition: &str) -> String {
    format!("{indent}if ({condition})\n{indent}{{\n")
}

/// Closes the true branch and opens the false one.
pub fn else_open(indent: &str) -> String {
    format!("\n{indent}}}\n{indent}else\n{indent}{{\n")
}

pub fn body_close(indent: &str) -> String {
    format!("\n{indent}}}")
}

pub fn digital_write(indent: &str, pin: u32, value: PinLevel) -> String {
    format!("{indent}digitalWrite({pin},{value});")
}

pub fn digital_read(indent: &str, variable: &str, pin: u32) -> String {
    format!("{indent}{variable} = digitalRead({pin});")
}

pub fn delay(indent: &str, length: u64) -> String {
    format!("{indent}delay({length});")
}

/// User code goes out untouched apart from the terminating semicolon.
pub fn raw_code(indent: &str, code: &str) -> String {
    format!("{indent}{code};")
}

pub fn int_declaration(indent: &str, name: &str) -> String {
    format!("{indent}int {name} = 0;")
}
