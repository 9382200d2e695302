/// `(command, usage, description)` in the order `!help` prints them.
pub const COMMANDS: &[(&str, &str, &str)] = &[
    ("help", "!help", "List the available commands."),
    ("sheettest", "!sheettest", "Write the current time to A1 of the check sheet and read it back."),
    ("start", "!start A B", "Start a duel between A and B in this channel."),
    ("attack", "!attack", "Roll the attack dice for the current attacker."),
    ("defend", "!defend", "Roll the defense dice against the pending attack."),
    ("end", "!end", "Stop the duel now; HP decides the winner."),
    ("status", "!status", "Show HP bars and whose turn it is."),
    ("total", "!total", "Read the summary cells of the HP sheet."),
    ("buy", "!buy NAME ITEM", "Append ITEM to NAME's inventory on the roster sheet."),
    ("use", "!use NAME ITEM", "Remove one ITEM from NAME's inventory."),
    ("add", "!add NAME N", "Add N to NAME's HP on the HP sheet."),
    ("sub", "!sub NAME N", "Subtract N from NAME's HP on the HP sheet."),
    ("ping", "!ping", "Check that the dispatcher is running."),
];

pub fn render() -> Vec<String> {
    let mut lines = vec!["Available commands".to_string()];
    lines.extend(
        COMMANDS
            .iter()
            .map(|(_, usage, desc)| format!("  {:<16} {}", usage, desc)),
    );
    lines
}
