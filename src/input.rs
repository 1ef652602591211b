//! Prompted Input Collection
//!
//! Reads the three employee fields in a fixed order: name, department, salary.
//! Each prompt is written without a trailing newline and flushed before the
//! matching line is read. Any field already supplied (for example from a CLI
//! flag) skips its prompt.

use std::io::{BufRead, Write};

use crate::error::{EntryError, Result};
use crate::record::{parse_salary, NewEmployee};

pub const NAME_PROMPT: &str = "Enter employee name: ";
pub const DEPARTMENT_PROMPT: &str = "Enter employee department: ";
pub const SALARY_PROMPT: &str = "Enter employee salary: ";

/// Fields supplied up front; `None` means "prompt for it"
#[derive(Debug, Clone, Default)]
pub struct PresetFields {
    pub name: Option<String>,
    pub department: Option<String>,
    pub salary: Option<String>,
}

/// Collect one employee record, prompting on `prompt_out` and reading from `input`
pub fn collect_employee<R: BufRead, W: Write>(
    input: &mut R,
    prompt_out: &mut W,
    preset: PresetFields,
) -> Result<NewEmployee> {
    let name = match preset.name {
        Some(name) => name,
        None => prompt_line(input, prompt_out, NAME_PROMPT, "name")?,
    };

    let department = match preset.department {
        Some(department) => department,
        None => prompt_line(input, prompt_out, DEPARTMENT_PROMPT, "department")?,
    };

    let raw_salary = match preset.salary {
        Some(salary) => salary,
        None => prompt_line(input, prompt_out, SALARY_PROMPT, "salary")?,
    };
    let salary = parse_salary(&raw_salary)?;

    Ok(NewEmployee { name, department, salary })
}

/// Write `prompt`, then read one line with its line terminator removed
fn prompt_line<R: BufRead, W: Write>(
    input: &mut R,
    prompt_out: &mut W,
    prompt: &str,
    field: &str,
) -> Result<String> {
    prompt_out
        .write_all(prompt.as_bytes())
        .and_then(|()| prompt_out.flush())
        .map_err(|e| EntryError::invalid_input(format!("Could not write {field} prompt: {e}")))?;

    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .map_err(|e| EntryError::invalid_input(format!("Could not read employee {field}: {e}")))?;

    if read == 0 {
        return Err(EntryError::invalid_input(format!(
            "Input ended before employee {field} was entered"
        )));
    }

    // The final line may end in a bare `\r` when input stops without a newline
    if line.ends_with('\n') {
        line.pop();
    }
    if line.ends_with('\r') {
        line.pop();
    }

    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn collect(stdin: &str, preset: PresetFields) -> (Result<NewEmployee>, String) {
        let mut input = Cursor::new(stdin.as_bytes().to_vec());
        let mut prompts = Vec::new();
        let result = collect_employee(&mut input, &mut prompts, preset);
        (result, String::from_utf8(prompts).unwrap())
    }

    #[test]
    fn test_collects_fields_in_order() {
        let (result, prompts) = collect("Alice\nEngineering\n75000.5\n", PresetFields::default());

        assert_eq!(result.unwrap(), NewEmployee::new("Alice", "Engineering", 75000.5));
        assert_eq!(
            prompts,
            "Enter employee name: Enter employee department: Enter employee salary: "
        );
    }

    #[test]
    fn test_windows_line_endings() {
        let (result, _) = collect("Bob\r\nHR\r\n55000\r\n", PresetFields::default());
        assert_eq!(result.unwrap(), NewEmployee::new("Bob", "HR", 55000.0));
    }

    #[test]
    fn test_accepts_empty_text_fields() {
        let (result, _) = collect("\n\n-5\n", PresetFields::default());
        assert_eq!(result.unwrap(), NewEmployee::new("", "", -5.0));
    }

    #[test]
    fn test_keeps_inner_whitespace() {
        let (result, _) = collect("  Ada Lovelace \nR&D\n1\n", PresetFields::default());
        assert_eq!(result.unwrap().name, "  Ada Lovelace ");
    }

    #[test]
    fn test_last_line_without_newline() {
        let (result, _) = collect("Carol\nOps\n42", PresetFields::default());
        assert_eq!(result.unwrap().salary, 42.0);
    }

    #[test]
    fn test_last_line_with_bare_carriage_return() {
        let (result, _) = collect("Carol\r\nOps\r\n42\r", PresetFields::default());
        let employee = result.unwrap();
        assert_eq!(employee.name, "Carol");
        assert_eq!(employee.salary, 42.0);

        let mut input = Cursor::new(b"Carol\r".to_vec());
        let name = prompt_line(&mut input, &mut Vec::new(), "Enter employee name: ", "name");
        assert_eq!(name.unwrap(), "Carol");
    }

    #[test]
    fn test_non_numeric_salary() {
        let (result, _) = collect("Dan\nSales\nmany\n", PresetFields::default());
        let err = result.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_end_of_input() {
        let (result, prompts) = collect("Eve\n", PresetFields::default());
        let err = result.unwrap_err();
        assert!(err.message().contains("department"));
        assert_eq!(prompts, "Enter employee name: Enter employee department: ");
    }

    #[test]
    fn test_preset_fields_skip_prompts() {
        let preset = PresetFields {
            name: Some("Frank".to_string()),
            department: None,
            salary: Some("1000".to_string()),
        };
        let (result, prompts) = collect("Finance\n", preset);

        assert_eq!(result.unwrap(), NewEmployee::new("Frank", "Finance", 1000.0));
        assert_eq!(prompts, "Enter employee department: ");
    }
}
