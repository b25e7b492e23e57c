//! A shared library that deliberately exports no plugin symbols.

#[no_mangle]
pub extern "C" fn unrelated_symbol() -> i32 {
    7
}
