pub const EXPAND_INSTRUCTION: &str = include_str!("../data/prompts/expand_instruction.txt");
pub const DESCRIBE_INSTRUCTION: &str = include_str!("../data/prompts/describe_instruction.txt");

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}
