use applyportal_core::SectionKind;
use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};

pub fn validator_section() -> ValueParser {
    ValueParser::from(move |section: &str| -> std::result::Result<SectionKind, String> {
        section.parse::<SectionKind>()
    })
}

fn section_arg() -> Arg {
    Arg::new("section")
        .help("Section: bio-data, academic-history, employment-history, recommendations, uploads, attestation, payment")
        .required(true)
        .value_parser(validator_section())
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("applyportal")
        .about("Fill in, save and submit your application from the command line")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Log more (-v info, -vv debug, -vvv trace); RUST_LOG takes precedence")
                .global(true)
                .action(ArgAction::Count),
        )
        .subcommand(
            Command::new("login")
                .about("Sign in")
                .arg(
                    Arg::new("email")
                        .short('e')
                        .long("email")
                        .help("Account email, defaults to the last one used")
                        .env("APPLYPORTAL_EMAIL"),
                )
                .arg(
                    Arg::new("password")
                        .long("password")
                        .help("Password, prompted for when absent")
                        .env("APPLYPORTAL_PASSWORD")
                        .hide_env_values(true)
                        .hide(true),
                )
                .arg(
                    Arg::new("remember")
                        .short('r')
                        .long("remember")
                        .help("Keep the password in the OS keychain")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("register")
                .about("Create an account")
                .arg(Arg::new("email").long("email").short('e').required(true))
                .arg(Arg::new("first-name").long("first-name").required(true))
                .arg(Arg::new("last-name").long("last-name").required(true))
                .arg(Arg::new("phone").long("phone"))
                .arg(
                    Arg::new("password")
                        .long("password")
                        .env("APPLYPORTAL_PASSWORD")
                        .hide_env_values(true)
                        .hide(true),
                ),
        )
        .subcommand(
            Command::new("logout")
                .about("Sign out and clear local application data")
                .arg(
                    Arg::new("forget")
                        .long("forget")
                        .help("Also remove the remembered password")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("status").about("Show the session and wizard progress"))
        .subcommand(Command::new("sync").about("Pull the application from the server"))
        .subcommand(
            Command::new("show")
                .about("Print a section's local data as JSON")
                .arg(section_arg()),
        )
        .subcommand(
            Command::new("edit")
                .about("Merge a JSON object into a section's local data")
                .arg(section_arg())
                .arg(
                    Arg::new("patch")
                        .help("JSON object, e.g. '{\"firstName\": \"Ada\"}'")
                        .required_unless_present("file"),
                )
                .arg(
                    Arg::new("file")
                        .short('f')
                        .long("file")
                        .help("Read the JSON object from a file")
                        .conflicts_with("patch"),
                ),
        )
        .subcommand(
            Command::new("push")
                .about("Save a section to the server")
                .arg(section_arg()),
        )
        .subcommand(
            Command::new("upload")
                .about("Upload a document")
                .arg(Arg::new("kind").help("Document kind, e.g. cv, transcript").required(true))
                .arg(Arg::new("path").help("File to upload").required(true))
                .arg(Arg::new("mime").long("mime").help("Content type, guessed from the extension when absent")),
        )
        .subcommand(
            Command::new("pay")
                .about("Start the application fee payment")
                .arg(Arg::new("callback-url").long("callback-url")),
        )
        .subcommand(
            Command::new("verify-payment")
                .about("Check a payment, by default the last one started")
                .arg(Arg::new("reference")),
        )
        .subcommand(Command::new("submit").about("Submit the application"))
        .subcommand(
            Command::new("step")
                .about("Move through the wizard: show, next, prev or a step number")
                .arg(Arg::new("target").default_value("show")),
        )
        .subcommand(Command::new("summary").about("Render the local application"))
        .subcommand(
            Command::new("review")
                .about("Render another applicant's application (members and admins)")
                .arg(Arg::new("id").required(true)),
        )
}
