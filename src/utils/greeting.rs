#![forbid(unsafe_code)]

// ***************************************************************************
//                                Constants
// ***************************************************************************
// Fixed text returned when the request carries no name.
const WELCOME_MESSAGE : &str = "Welcome to our demo application!";

// ***************************************************************************
// GENERAL PUBLIC FUNCTIONS
// ***************************************************************************
// ---------------------------------------------------------------------------
// welcome_message:
// ---------------------------------------------------------------------------
/** The greeting used when the caller supplies no name. */
pub fn welcome_message() -> String {
    WELCOME_MESSAGE.to_string()
}

// ---------------------------------------------------------------------------
// greeting:
// ---------------------------------------------------------------------------
/** Build the personalized greeting.  The name is embedded verbatim, so the
 * result always contains it as a substring.  An empty name is allowed and
 * yields "Hello, !".
 */
pub fn greeting(name: &str) -> String {
    format!("Hello, {}!", name)
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use crate::utils::greeting::{greeting, welcome_message};

    #[test]
    fn welcome_message_is_fixed() {
        let message = welcome_message();
        assert!(!message.is_empty());
        assert_eq!(message, "Welcome to our demo application!");
    }

    #[test]
    fn greeting_contains_name() {
        let message = greeting("Test User");
        assert!(!message.is_empty());
        assert!(message.contains("Test User"));
        assert_eq!(message, "Hello, Test User!");
    }

    #[test]
    fn greeting_embeds_any_name_verbatim() {
        for name in ["bud", "Test User", "héllo wörld", "<b>markup</b>", "trailing space "] {
            let message = greeting(name);
            assert!(message.contains(name));
        }
    }

    #[test]
    fn greeting_accepts_empty_name() {
        // Empty is distinct from absent and keeps the templated form.
        assert_eq!(greeting(""), "Hello, !");
    }
}
