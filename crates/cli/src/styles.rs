use clap::builder::Styles;
use clap::builder::styling::AnsiColor;

/// Help colours in cargo's scheme: green bold headings, cyan literals.
pub fn cli_styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Green.on_default().bold())
		.usage(AnsiColor::Green.on_default().bold())
		.literal(AnsiColor::Cyan.on_default())
		.placeholder(AnsiColor::Cyan.on_default())
		.valid(AnsiColor::Cyan.on_default())
		.invalid(AnsiColor::Yellow.on_default())
		.error(AnsiColor::Red.on_default().bold())
}
