//! Fixed instruction template sent with every conversion request.

/// System message framing the porting task.
pub fn system_message() -> String {
    "You are an assistant that reimplements Python code in high performance C++. \
     Respond only with C++ code; use comments sparingly and do not provide any \
     explanation other than occasional comments. The C++ response needs to produce \
     an identical output in the fastest possible time."
        .to_string()
}

/// User message wrapping the Python source with the porting instructions.
pub fn user_message(source: &str) -> String {
    format!(
        "Rewrite this Python code in C++ with the fastest possible implementation that \
         produces identical output in the least time. Respond only with C++ code; do not \
         explain your work other than a few comments. Pay attention to number types to \
         ensure no int overflows. Remember to #include all necessary C++ packages such as \
         iomanip.\n\n{source}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_embeds_source() {
        let message = user_message("print('hello')");
        assert!(message.ends_with("print('hello')"));
        assert!(message.contains("identical output"));
    }

    #[test]
    fn test_system_message_is_cpp_only() {
        assert!(system_message().contains("C++"));
    }
}
