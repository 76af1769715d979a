use chatwarden::{FilterOutcome, RuleChain};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";
}

pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
        if self.enabled { format!("{}{}{}", color, s.as_ref(), ansi::RESET) } else { s.as_ref().to_string() }
    }

    fn bold(&self, s: impl AsRef<str>) -> String {
        self.paint(s, ansi::BOLD)
    }

    fn dim(&self, s: impl AsRef<str>) -> String {
        self.paint(s, ansi::DIM)
    }

    fn flag(&self, label: &str, on: bool, color: &str) -> String {
        if on { self.paint(format!("✓ {label}"), color) } else { self.dim(format!("✗ {label}")) }
    }
}

pub fn print_chain(chain: &RuleChain, palette: &Palette) {
    println!(
        "\n{} {}",
        palette.bold(palette.paint(format!("⚙  Chain \"{}\"", chain.name()), ansi::CYAN)),
        palette.dim(format!("({} rules)", chain.rule_count()))
    );
    for rule in chain.rules() {
        let tokens: Vec<&str> = rule.actions().iter().map(|a| a.token()).collect();
        println!(
            "  {} {} {} {}",
            palette.paint(format!("{:>4}", rule.line()), ansi::GRAY),
            palette.paint(rule.matcher().to_string(), ansi::BLUE),
            palette.dim("→"),
            if tokens.is_empty() { palette.dim("(no actions)") } else { tokens.join(", ") }
        );
    }
}

pub fn print_outcome(input: &str, outcome: &FilterOutcome, effects: &[String], palette: &Palette) {
    println!("\n{}", palette.paint(format!("━━━ \"{input}\" ━━━"), ansi::GRAY));

    let text = if outcome.modified { palette.bold(&outcome.display_text) } else { palette.dim(&outcome.display_text) };
    println!("  {} {}", palette.dim("result:"), text);
    println!(
        "  {}  {}  {}",
        palette.flag("cancelled", outcome.cancelled, ansi::RED),
        palette.flag("modified", outcome.modified, ansi::YELLOW),
        palette.flag("logged", outcome.logged, ansi::GREEN),
    );

    if !outcome.matched_lines.is_empty() {
        let lines: Vec<String> = outcome.matched_lines.iter().map(usize::to_string).collect();
        println!("  {} {}", palette.dim("matched lines:"), palette.paint(lines.join(", "), ansi::BLUE));
    }
    for effect in effects {
        println!("  {} {}", palette.paint("⚑", ansi::YELLOW), effect);
    }
    for message in &outcome.log_messages {
        println!("  {} {}", palette.dim("log:"), message);
    }

    let m = &outcome.metrics;
    println!(
        "  {}",
        palette.dim(format!(
            "{:?}  │  rules {}/{} matched  │  actions {} ({} failed, {} unsupported)",
            m.duration, m.rules_matched, m.rules_evaluated, m.actions_executed, m.actions_failed, m.actions_unsupported
        ))
    );
}

pub fn print_score(author: &str, score: f64, palette: &Palette) {
    println!("\n{} {}", palette.dim(format!("score for {author}:")), palette.paint(format!("{score:.2}"), ansi::GREEN));
    println!();
}
