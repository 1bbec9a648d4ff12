use thiserror::Error;

/// Why a command line could not be tokenized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SplitError {
    #[error("unterminated quoted string")]
    UnterminatedQuote,
    #[error("trailing escape character")]
    TrailingEscape,
}

/// Shell-like argument splitting.
///
/// Handles:
/// - Whitespace-separated arguments
/// - Single quotes (everything literal until the closing quote)
/// - Double quotes (backslash escapes the next character)
/// - Backslash escapes outside quotes
///
/// Quotes may appear mid-word (`a"b c"d` is one token `ab cd`) and an empty
/// quoted string (`''`) is an empty token.
pub fn split(input: &str) -> Result<Vec<String>, SplitError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escape_next = false;

    for ch in input.chars() {
        if escape_next {
            current.push(ch);
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if !in_single_quote => {
                escape_next = true;
                in_token = true;
            }
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
                in_token = true;
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
                in_token = true;
            }
            c if c.is_whitespace() && !in_single_quote && !in_double_quote => {
                if in_token {
                    args.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            _ => {
                current.push(ch);
                in_token = true;
            }
        }
    }

    if escape_next {
        return Err(SplitError::TrailingEscape);
    }
    if in_single_quote || in_double_quote {
        return Err(SplitError::UnterminatedQuote);
    }
    if in_token {
        args.push(current);
    }

    Ok(args)
}
