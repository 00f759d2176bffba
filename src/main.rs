//! Binary entrypoint for the Beyonder CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml` and create the data directory
//! - `register` / `login` / `logout` / `whoami` / `users` - account and session handling
//! - `character ...` - manage the active user's characters; `recalc` recomputes vitals,
//!   `inventory`/`ability`/`trait`/`talent`/`personal` edit the rest of the sheet
//! - `skills ...` - show the skill pool, train skills, add notes
//! - `roll [die] [-m <mod>]` - roll dice (`d%` for a percentile check)
//! - `campaign ...` - campaign book, party invites, sync and member inspection
//! - `friend ...` - friend list by `name#tag`
//!
//! See the library crate docs for module-level details: `beyonder::`.
use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info, warn};

use beyonder::campaign::{CampaignBook, CampaignStatus, Clearance, EntityKind, EntityStatus};
use beyonder::config::Config;
use beyonder::dice::{parse_sides, DiceRoller, PERCENTILE_SIDES};
use beyonder::logutil::escape_log;
use beyonder::sheet::{
    find_skill, AttributeKind, Character, PersonalField, Roster, TalentKind, VitalKind, SKILLS,
};
use beyonder::social::{self, UserRegistry};
use beyonder::storage::SledStore;
use beyonder::validation::split_name_tag;

#[derive(Parser)]
#[command(name = "beyonder")]
#[command(about = "Character sheets, campaign book and dice roller for tabletop RPG tables")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Act as this user instead of the logged-in one. Local convenience only:
    /// no password is checked, so anyone with access to the data directory can
    /// act as any user (including a campaign's game master)
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Answer yes to every confirmation prompt
    #[arg(short = 'y', long, global = true)]
    yes: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Create an account (prompts for a password)
    Register { username: String },
    /// Log in; later commands act as this user
    Login { username: String },
    /// Forget the logged-in user
    Logout,
    /// Show the current user and their friend tag
    Whoami,
    /// List accounts registered in this data directory
    Users,
    /// Manage characters
    Character {
        #[command(subcommand)]
        command: CharacterCommand,
    },
    /// Skill pool and skill training for the active character
    Skills {
        #[command(subcommand)]
        command: SkillsCommand,
    },
    /// Roll a die: d4, d6, d8, d10, d12, d20 (default) or d% / d100
    Roll {
        #[arg(default_value = "d20")]
        die: String,
        /// Added to the face (ignored for percentile checks)
        #[arg(short, long, default_value_t = 0, allow_hyphen_values = true)]
        modifier: i64,
        /// Print recent rolls instead of rolling
        #[arg(long)]
        history: bool,
        /// Clear the roll history
        #[arg(long, conflicts_with = "history")]
        clear: bool,
    },
    /// Campaign book
    Campaign {
        #[command(subcommand)]
        command: CampaignCommand,
    },
    /// Friends list
    Friend {
        #[command(subcommand)]
        command: FriendCommand,
    },
}

#[derive(Subcommand)]
enum CharacterCommand {
    /// Create a character and make it active
    New { name: Option<String> },
    /// List characters
    List,
    /// Make a character active (id, id prefix or name)
    Select { id: String },
    /// Delete a character
    Delete { id: String },
    /// Show the active character
    Show,
    /// Rename the active character
    Rename { name: String },
    /// Set the active character's pathway
    Pathway { name: String },
    /// Set an attribute (STR/AGI/INT/VIG/MYS/PRE or full name)
    Attr { attribute: String, value: u32 },
    /// Set the sequence (9 = least advanced, 0 = most)
    Level { sequence: u8 },
    /// Set a vital's current value (`12`), adjust it (`+5`, `-3`), or set its max with --max
    Vital {
        vital: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
        #[arg(long)]
        max: bool,
    },
    /// Recompute maximum Health/Energy/Sanity from attributes and sequence
    Recalc,
    /// Show or rename how an attribute is displayed (blank label restores it)
    Label {
        attribute: String,
        label: Option<String>,
    },
    /// Set origin and optional sub-choice (empty origin clears both)
    Origin { origin: String, choice: Option<String> },
    /// Replace the backstory
    Backstory { text: String },
    /// Show personal details, or set one field (`character personal fear "the dark"`)
    Personal {
        field: Option<String>,
        #[arg(allow_hyphen_values = true)]
        value: Option<String>,
    },
    /// Update the soul artifact; only the given parts change
    Artifact {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        abilities: Option<String>,
        #[arg(long)]
        disadvantage: Option<String>,
        #[arg(long)]
        sealing: Option<String>,
    },
    /// Inventory and sealed artifacts
    Inventory {
        #[command(subcommand)]
        command: InventoryCommand,
    },
    /// Beyonder abilities
    Ability {
        #[command(subcommand)]
        command: AbilityCommand,
    },
    /// Character traits
    Trait {
        #[command(subcommand)]
        command: AbilityCommand,
    },
    /// Talents (generic, special, combat, mundane)
    Talent {
        #[command(subcommand)]
        command: TalentCommand,
    },
}

#[derive(Subcommand)]
enum InventoryCommand {
    /// Add an item
    Add {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        /// Mark as a sealed artifact
        #[arg(long)]
        sealed: bool,
        /// Sealed artifact grade (0-3)
        #[arg(long, requires = "sealed")]
        grade: Option<u8>,
    },
    /// Remove an item (id, id prefix or name)
    Remove { item: String },
}

#[derive(Subcommand)]
enum AbilityCommand {
    /// Add an entry
    Add {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        /// Free-text cost, e.g. "10 Spirituality"
        #[arg(long, default_value = "")]
        cost: String,
    },
    /// Remove an entry (id, id prefix or name)
    Remove { entry: String },
}

#[derive(Subcommand)]
enum TalentCommand {
    /// Add a talent
    Add {
        name: String,
        #[arg(short, long, default_value = "generic")]
        kind: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Remove a talent (id, id prefix or name)
    Remove { talent: String },
}

#[derive(Subcommand)]
enum SkillsCommand {
    /// Show the skill pool and every skill
    Show,
    /// Set trained points (drawn from the pool)
    Train { skill: String, points: u32 },
    /// Set extra points (bonuses outside the pool)
    Extra { skill: String, points: u32 },
    /// Attach a note to a skill (omit the note to clear it)
    Note { skill: String, note: Option<String> },
    /// Rename how a skill is displayed (omit the label to restore it)
    Label { skill: String, label: Option<String> },
}

#[derive(Subcommand)]
enum CampaignCommand {
    /// Start a campaign with you as game master
    Create {
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Campaigns you run or play in
    List,
    /// Show one campaign
    Show { id: String },
    /// Full sheet of one party member's character
    Inspect { id: String, member: String },
    /// Add a session report
    Log {
        id: String,
        title: String,
        content: String,
        #[arg(long, default_value = "level1")]
        clearance: String,
    },
    /// Add a dossier entry
    Dossier {
        id: String,
        name: String,
        #[arg(short, long, default_value = "npc")]
        kind: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(long)]
        threat: Option<u8>,
    },
    /// Change a dossier entry's status
    DossierStatus {
        id: String,
        dossier: String,
        status: String,
    },
    /// Replace the evidence board text
    Evidence { id: String, text: String },
    /// Change the campaign status
    Status { id: String, status: String },
    /// Add a player's published character to the party
    Invite {
        id: String,
        username: String,
        /// Read the character from a JSON file instead of the player's snapshot
        #[arg(long)]
        json_file: Option<String>,
    },
    /// Re-read every party member's latest published character
    Sync { id: String },
    /// Remove a player from the party
    Kick { id: String, username: String },
    /// Leave a campaign you were invited to
    Leave { id: String },
    /// Delete a campaign
    Delete { id: String },
}

#[derive(Subcommand)]
enum FriendCommand {
    /// Add a friend by `name#tag`
    Add { handle: String },
    /// Remove a friend by name
    Remove { name: String },
    /// List friends
    List,
}

/// `--user` wins over the stored session. Acting as someone other than the
/// logged-in user is recorded on the security log.
fn acting_identity(user_override: Option<&str>, session: Option<String>) -> Option<String> {
    match (user_override, session) {
        (Some(u), Some(s)) if !u.eq_ignore_ascii_case(&s) => {
            warn!(target: "security", "{} acting as {} via --user", escape_log(&s), escape_log(u));
            Some(u.to_string())
        }
        (Some(u), None) => {
            warn!(target: "security", "acting as {} via --user without a login", escape_log(u));
            Some(u.to_string())
        }
        (Some(u), Some(_)) => Some(u.to_string()),
        (None, session) => session,
    }
}

/// Everything a command needs: config, the open store and who is acting.
struct App {
    config: Config,
    store: SledStore,
    user_override: Option<String>,
    assume_yes: bool,
}

impl App {
    fn acting_user(&self) -> Result<String> {
        let session = social::current_user(&self.store)?;
        acting_identity(self.user_override.as_deref(), session)
            .ok_or_else(|| anyhow!("Not logged in. Run `beyonder login <name>` or pass --user."))
    }

    /// Ask on stdin unless `--yes` was given or prompts are disabled in config.
    fn confirm(&self, prompt: &str) -> Result<bool> {
        if self.assume_yes || !self.config.app.confirm_destructive {
            return Ok(true);
        }
        print!("{} [y/N] ", prompt);
        std::io::stdout().flush()?;
        let mut answer = String::new();
        std::io::stdin().lock().read_line(&mut answer)?;
        Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }

    fn registry(&self) -> Result<UserRegistry<'_, SledStore>> {
        let params = self.config.security.argon2_params()?;
        Ok(UserRegistry::with_params(&self.store, params))
    }

    fn roster(&self) -> Result<Roster> {
        let user = self.acting_user()?;
        Ok(Roster::load_or_create(&self.store, &user)?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        init_logging(&None, cli.verbose);
        return init_config(&cli.config, cli.yes).await;
    }

    let config = if Path::new(&cli.config).exists() {
        Config::load(&cli.config).await?
    } else {
        Config::default()
    };
    init_logging(&Some(config.clone()), cli.verbose);
    if !Path::new(&cli.config).exists() {
        debug!("{} not found; using built-in defaults", cli.config);
    }

    let db_path = config.storage.database_path();
    let store = SledStore::open(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
    let app = App {
        config,
        store,
        user_override: cli.user,
        assume_yes: cli.yes,
    };

    match cli.command {
        Commands::Init => unreachable!("handled above"),
        Commands::Register { username } => cmd_register(&app, &username),
        Commands::Login { username } => cmd_login(&app, &username),
        Commands::Logout => {
            if social::logout(&app.store)? {
                println!("Logged out.");
            } else {
                println!("Nobody was logged in.");
            }
            Ok(())
        }
        Commands::Whoami => {
            let user = app.acting_user()?;
            match app.registry()?.get(&user) {
                Ok(profile) => println!("{}", profile.handle()),
                Err(_) => println!("{} (no account)", user),
            }
            Ok(())
        }
        Commands::Users => {
            for profile in app.registry()?.list()? {
                println!("{}", profile.handle());
            }
            Ok(())
        }
        Commands::Character { command } => cmd_character(&app, command),
        Commands::Skills { command } => cmd_skills(&app, command),
        Commands::Roll {
            die,
            modifier,
            history,
            clear,
        } => cmd_roll(&app, &die, modifier, history, clear),
        Commands::Campaign { command } => cmd_campaign(&app, command),
        Commands::Friend { command } => cmd_friend(&app, command),
    }
}

async fn init_config(path: &str, overwrite: bool) -> Result<()> {
    if Path::new(path).exists() && !overwrite {
        return Err(anyhow!("{} already exists (pass --yes to overwrite)", path));
    }
    info!("Initializing new configuration");
    Config::create_default(path).await?;
    let cfg = Config::default();
    tokio::fs::create_dir_all(&cfg.storage.data_dir)
        .await
        .with_context(|| format!("Failed to create data directory {}", cfg.storage.data_dir))?;
    info!("Configuration file created at {}", path);
    println!("Wrote {} (data in {})", path, cfg.storage.data_dir);
    Ok(())
}

fn cmd_register(app: &App, username: &str) -> Result<()> {
    let pass1 = rpassword::prompt_password("New password: ")?;
    let pass2 = rpassword::prompt_password("Confirm password: ")?;
    if pass1 != pass2 {
        return Err(anyhow!("passwords do not match"));
    }
    let profile = app.registry()?.register(username, &pass1)?;
    social::login(&app.store, &profile.username)?;
    Roster::load_or_create(&app.store, &profile.username)?;
    println!("Welcome, {}. Share this handle with friends.", profile.handle());
    Ok(())
}

fn cmd_login(app: &App, username: &str) -> Result<()> {
    let password = rpassword::prompt_password("Password: ")?;
    let profile = app.registry()?.authenticate(username, &password)?;
    social::login(&app.store, &profile.username)?;
    info!(target: "security", "login {}", escape_log(&profile.username));
    println!("Logged in as {}.", profile.handle());
    Ok(())
}

fn print_character(c: &Character) {
    let id_short: String = c.id.chars().take(8).collect();
    println!("{}  [{}]  {}, Sequence {}", c.name, id_short, c.pathway, c.sequence);
    let attrs: Vec<String> = AttributeKind::ALL
        .iter()
        .map(|k| format!("{} {}", k.short_name(), c.attributes.get(*k)))
        .collect();
    println!("  {}", attrs.join("  "));
    for kind in VitalKind::ALL {
        let r = c.vitals.get(kind);
        let flag = match kind {
            VitalKind::Health if r.current == 0 => "  (down)",
            VitalKind::Health if c.vitals.is_health_critical() => "  (critical)",
            VitalKind::Sanity if c.vitals.is_corrupted() => "  (lost to corruption)",
            VitalKind::Sanity if c.vitals.is_sanity_low() => "  (unstable)",
            _ => "",
        };
        println!("  {:<7} {:>4} / {:<4}{}", kind.label(), r.current, r.max, flag);
    }
    let pool = c.skill_pool();
    println!(
        "  Skill points: {} spent of {}, {} remaining",
        pool.spent, pool.total_available, pool.remaining
    );
    if !c.notes.is_empty() {
        println!("  Notes: {}", c.notes);
    }
}

fn print_details(c: &Character) {
    if let Some(origin) = &c.origin {
        match &c.origin_choice {
            Some(choice) => println!("  Origin: {} ({})", origin, choice),
            None => println!("  Origin: {}", origin),
        }
    }
    if !c.backstory.is_empty() {
        println!("  Backstory: {}", c.backstory);
    }
    let relabelled: Vec<String> = c
        .attribute_labels
        .iter()
        .map(|(kind, label)| format!("{} = {}", kind.short_name(), label))
        .collect();
    if !relabelled.is_empty() {
        println!("  Attribute labels: {}", relabelled.join(", "));
    }
    for (title, list) in [("Abilities", &c.abilities), ("Traits", &c.traits)] {
        if list.is_empty() {
            continue;
        }
        println!("  {}:", title);
        for a in list {
            let cost = if a.cost.is_empty() { String::new() } else { format!(" [{}]", a.cost) };
            println!("    {}{}  {}", a.name, cost, a.description);
        }
    }
    if !c.talents.is_empty() {
        println!("  Talents:");
        for t in &c.talents {
            println!("    {} ({})  {}", t.name, t.kind, t.description);
        }
    }
    if !c.inventory.is_empty() {
        println!("  Inventory:");
        for item in &c.inventory {
            let sealed = match (item.sealed_artifact, item.grade) {
                (true, Some(g)) => format!(" [sealed, grade {}]", g),
                (true, None) => " [sealed]".to_string(),
                _ => String::new(),
            };
            println!("    {}{}  {}", item.name, sealed, item.description);
        }
    }
}

fn print_personal(c: &Character) {
    for field in PersonalField::ALL {
        let value = c.personal.get(*field);
        if !value.is_empty() {
            println!("  {}: {}", field.label(), value);
        }
    }
    let a = &c.personal.soul_artifact;
    if !a.is_empty() {
        println!("  Soul artifact: {}", a.name);
        println!("    Abilities: {}", a.abilities);
        println!("    Disadvantage: {}", a.disadvantage);
        println!("    Sealing: {}", a.sealing_method);
    }
}

fn cmd_character(app: &App, command: CharacterCommand) -> Result<()> {
    let mut roster = app.roster()?;
    match command {
        CharacterCommand::New { name } => {
            let pathway = app.config.app.default_pathway.clone();
            let created = roster.create(name.as_deref())?;
            let id = created.id.clone();
            roster.active_mut().pathway = pathway;
            roster.save(&app.store)?;
            println!("Created {} [{}] and made it active.", roster.active().name, id);
        }
        CharacterCommand::List => {
            let active_id = roster.active().id.clone();
            for c in roster.characters() {
                let marker = if c.id == active_id { "*" } else { " " };
                let id_short: String = c.id.chars().take(8).collect();
                println!("{} {}  {}  ({}, S{})", marker, id_short, c.name, c.pathway, c.sequence);
            }
        }
        CharacterCommand::Select { id } => {
            let name = roster.select(&id)?.name.clone();
            roster.save(&app.store)?;
            println!("{} is now active.", name);
        }
        CharacterCommand::Delete { id } => {
            let target = roster.find(&id)?.name.clone();
            if !app.confirm(&format!("Delete {} permanently?", target))? {
                println!("Cancelled.");
                return Ok(());
            }
            let removed = roster.delete(&id)?;
            roster.save(&app.store)?;
            println!("Deleted {}. Active: {}.", removed.name, roster.active().name);
        }
        CharacterCommand::Show => {
            print_character(roster.active());
            print_details(roster.active());
        }
        CharacterCommand::Rename { name } => {
            let name = beyonder::validation::validate_character_name(&name)
                .map_err(|e| anyhow!("{}", e))?;
            roster.active_mut().name = name;
            roster.save(&app.store)?;
            print_character(roster.active());
        }
        CharacterCommand::Pathway { name } => {
            let name = beyonder::validation::validate_title("pathway", &name, 60)
                .map_err(|e| anyhow!("{}", e))?;
            roster.active_mut().pathway = name;
            roster.save(&app.store)?;
            print_character(roster.active());
        }
        CharacterCommand::Attr { attribute, value } => {
            let kind: AttributeKind = attribute.parse()?;
            roster.active_mut().attributes.set(kind, value);
            roster.save(&app.store)?;
            println!("{} set to {}. Run `beyonder character recalc` to update vitals.", kind, value);
        }
        CharacterCommand::Level { sequence } => {
            roster.active_mut().set_sequence(sequence)?;
            roster.save(&app.store)?;
            println!("Sequence set to {}. Run `beyonder character recalc` to update vitals.", sequence);
        }
        CharacterCommand::Vital { vital, value, max } => {
            let kind: VitalKind = vital.parse()?;
            let resource = roster.active_mut().vitals.get_mut(kind);
            let parsed: i64 = value
                .trim_start_matches('+')
                .parse()
                .map_err(|_| anyhow!("not a number: {}", value))?;
            if max {
                resource.set_max(parsed.max(0));
            } else if value.starts_with('+') || value.starts_with('-') {
                resource.adjust(parsed);
            } else {
                resource.set_current(parsed);
            }
            let after = *resource;
            roster.save(&app.store)?;
            println!("{}: {} / {}", kind, after.current, after.max);
        }
        CharacterCommand::Recalc => cmd_recalc(app, &mut roster)?,
        CharacterCommand::Label { attribute, label } => {
            let kind: AttributeKind = attribute.parse()?;
            if label.is_some() {
                roster.active_mut().relabel_attribute(kind, label.as_deref());
                roster.save(&app.store)?;
            }
            println!("{} is shown as {}.", kind, roster.active().attribute_label(kind));
        }
        CharacterCommand::Origin { origin, choice } => {
            roster.active_mut().set_origin(&origin, choice.as_deref());
            roster.save(&app.store)?;
            print_character(roster.active());
        }
        CharacterCommand::Backstory { text } => {
            roster.active_mut().set_backstory(&text);
            roster.save(&app.store)?;
            println!("Backstory updated.");
        }
        CharacterCommand::Personal { field, value } => match (field, value) {
            (None, _) => print_personal(roster.active()),
            (Some(field), None) => {
                let field: PersonalField = field.parse()?;
                println!("{}: {}", field.label(), roster.active().personal.get(field));
            }
            (Some(field), Some(value)) => {
                let field: PersonalField = field.parse()?;
                roster.active_mut().set_personal(field, &value);
                roster.save(&app.store)?;
                println!("{} updated.", field.label());
            }
        },
        CharacterCommand::Artifact {
            name,
            abilities,
            disadvantage,
            sealing,
        } => {
            let mut artifact = roster.active().personal.soul_artifact.clone();
            for (slot, value) in [
                (&mut artifact.name, name),
                (&mut artifact.abilities, abilities),
                (&mut artifact.disadvantage, disadvantage),
                (&mut artifact.sealing_method, sealing),
            ] {
                if let Some(v) = value {
                    *slot = v.trim().to_string();
                }
            }
            roster.active_mut().set_soul_artifact(artifact);
            roster.save(&app.store)?;
            print_personal(roster.active());
        }
        CharacterCommand::Inventory { command } => {
            match command {
                InventoryCommand::Add {
                    name,
                    description,
                    sealed,
                    grade,
                } => {
                    let item = roster.active_mut().add_item(&name, &description, sealed, grade)?;
                    println!("Added {}.", item.name);
                }
                InventoryCommand::Remove { item } => {
                    let removed = roster.active_mut().remove_item(&item)?;
                    println!("Removed {}.", removed.name);
                }
            }
            roster.save(&app.store)?;
        }
        CharacterCommand::Ability { command } => {
            let c = roster.active_mut();
            match command {
                AbilityCommand::Add {
                    name,
                    description,
                    cost,
                } => println!("Added ability {}.", c.add_ability(&name, &description, &cost)?.name),
                AbilityCommand::Remove { entry } => {
                    println!("Removed ability {}.", c.remove_ability(&entry)?.name)
                }
            }
            roster.save(&app.store)?;
        }
        CharacterCommand::Trait { command } => {
            let c = roster.active_mut();
            match command {
                AbilityCommand::Add {
                    name,
                    description,
                    cost,
                } => println!("Added trait {}.", c.add_trait(&name, &description, &cost)?.name),
                AbilityCommand::Remove { entry } => {
                    println!("Removed trait {}.", c.remove_trait(&entry)?.name)
                }
            }
            roster.save(&app.store)?;
        }
        CharacterCommand::Talent { command } => {
            let c = roster.active_mut();
            match command {
                TalentCommand::Add {
                    name,
                    kind,
                    description,
                } => {
                    let kind: TalentKind = kind.parse()?;
                    let t = c.add_talent(&name, kind, &description)?;
                    println!("Added {} talent {}.", t.kind, t.name);
                }
                TalentCommand::Remove { talent } => {
                    println!("Removed talent {}.", c.remove_talent(&talent)?.name)
                }
            }
            roster.save(&app.store)?;
        }
    }
    Ok(())
}

fn cmd_recalc(app: &App, roster: &mut Roster) -> Result<()> {
    let character = roster.active();
    let proposal = character.propose_vitals();
    println!(
        "Recalculating {} (VIG {}, MYS {}, Sequence {}):",
        character.name, character.attributes.vigor, character.attributes.mysticism, character.sequence
    );
    print!("{}", proposal);
    if proposal.is_unchanged() {
        println!("Maximums are already up to date.");
        return Ok(());
    }
    if !app.confirm("Apply these maximums?")? {
        println!("Left unchanged.");
        return Ok(());
    }
    proposal.apply(&mut roster.active_mut().vitals);
    roster.save(&app.store)?;
    info!("recalculated vitals for {}", escape_log(&roster.active().name));
    print_character(roster.active());
    Ok(())
}

fn cmd_skills(app: &App, command: SkillsCommand) -> Result<()> {
    let mut roster = app.roster()?;
    match command {
        SkillsCommand::Show => {
            let c = roster.active();
            print_pool(c);
            for (name, attr) in SKILLS {
                let entry = c.skills.entry(name);
                let mark = if entry.is_trained() { "*" } else { " " };
                let note = entry.notes.as_deref().map(|n| format!("  ({})", n)).unwrap_or_default();
                println!(
                    "{} {:<16} {}  trained {:>2}  extra {:>2}  total {:>2}{}",
                    mark,
                    c.skill_label(name),
                    attr.short_name(),
                    entry.trained,
                    entry.extra,
                    entry.total(),
                    note
                );
            }
            for (name, entry) in c.skills.iter().filter(|(n, _)| find_skill(n).is_none()) {
                println!(
                    "? {:<16} ---  trained {:>2}  extra {:>2}  total {:>2}",
                    name,
                    entry.trained,
                    entry.extra,
                    entry.total()
                );
            }
        }
        SkillsCommand::Train { skill, points } => {
            let (name, _) = find_skill(&skill).ok_or_else(|| anyhow!("unknown skill: {}", skill))?;
            roster.active_mut().skills.set_trained(name, points);
            roster.save(&app.store)?;
            print_pool(roster.active());
        }
        SkillsCommand::Note { skill, note } => {
            let (name, _) = find_skill(&skill).ok_or_else(|| anyhow!("unknown skill: {}", skill))?;
            let note = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
            roster.active_mut().skills.set_notes(name, note);
            roster.save(&app.store)?;
            println!("Note on {} updated.", name);
        }
        SkillsCommand::Label { skill, label } => {
            let (name, _) = find_skill(&skill).ok_or_else(|| anyhow!("unknown skill: {}", skill))?;
            roster.active_mut().relabel_skill(name, label.as_deref());
            roster.save(&app.store)?;
            println!("{} is shown as {}.", name, roster.active().skill_label(name));
        }
        SkillsCommand::Extra { skill, points } => {
            let (name, _) = find_skill(&skill).ok_or_else(|| anyhow!("unknown skill: {}", skill))?;
            roster.active_mut().skills.set_extra(name, points);
            roster.save(&app.store)?;
            print_pool(roster.active());
        }
    }
    Ok(())
}

fn print_pool(c: &Character) {
    let pool = c.skill_pool();
    let int = c.attributes.intelligence;
    let steps = beyonder::progression::advancement_steps(c.sequence);
    let mut formula = format!("(5 + {} INT)", int);
    if steps > 0 {
        formula.push_str(&format!(" + {}x(2 + {})", steps, int));
    }
    println!(
        "Skill pool {} = {}; spent {}; remaining {}",
        formula, pool.total_available, pool.spent, pool.remaining
    );
    if pool.is_over_budget() {
        warn!("{} is {} skill points over budget", escape_log(&c.name), -pool.remaining);
        println!("Over budget by {} points.", -pool.remaining);
    }
}

fn cmd_roll(app: &App, die: &str, modifier: i64, history: bool, clear: bool) -> Result<()> {
    let user = app.acting_user().ok();
    let mut roller = DiceRoller::new(app.config.dice.history_limit)
        .with_percentile_thresholds(app.config.dice.thresholds());
    if let Some(u) = &user {
        roller = roller.load_history(&app.store, u)?;
    }

    if history {
        for r in roller.history() {
            println!("{}", r);
        }
        return Ok(());
    }
    if clear {
        roller.clear();
    } else {
        let sides = parse_sides(die)?;
        let result = if sides == PERCENTILE_SIDES {
            roller.roll_percentile()
        } else {
            roller.roll(sides, modifier)?
        };
        println!("{}", result);
    }
    if let Some(u) = &user {
        roller.save_history(&app.store, u)?;
    }
    Ok(())
}

fn cmd_campaign(app: &App, command: CampaignCommand) -> Result<()> {
    let user = app.acting_user()?;
    let book = CampaignBook::new(&app.store);
    match command {
        CampaignCommand::Create { title, description } => {
            let c = book.create(&user, &title, &description)?;
            println!("Created campaign {} [{}].", c.title, c.id);
        }
        CampaignCommand::List => {
            for c in book.list_visible(&user)? {
                let role = if c.is_gm(&user) { "GM" } else { "player" };
                let id_short: String = c.id.chars().take(8).collect();
                println!(
                    "{}  {}  [{}] as {}, {} in party",
                    id_short,
                    c.title,
                    c.status,
                    role,
                    c.party.len()
                );
            }
        }
        CampaignCommand::Inspect { id, member } => {
            let c = book.get(&id)?;
            if !c.visible_to(&user) {
                return Err(anyhow!("campaign not found: {}", id));
            }
            let m = c
                .party
                .iter()
                .find(|m| {
                    m.owner.eq_ignore_ascii_case(&member)
                        || m.character.name.eq_ignore_ascii_case(&member)
                })
                .ok_or_else(|| anyhow!("no party member {}", member))?;
            println!("Played by {}, synced {}", m.owner, m.synced_at.format("%Y-%m-%d %H:%M"));
            print_character(&m.character);
            print_details(&m.character);
            print_personal(&m.character);
        }
        CampaignCommand::Show { id } => {
            let c = book.get(&id)?;
            if !c.visible_to(&user) {
                return Err(anyhow!("campaign not found: {}", id));
            }
            println!("{} [{}]  GM: {}  ({})", c.title, c.status, c.gamemaster, c.id);
            if !c.description.is_empty() {
                println!("{}", c.description);
            }
            println!("Party:");
            for m in &c.party {
                let ch = &m.character;
                println!(
                    "  {} ({}) S{}  HP {}/{}  EE {}/{}  SAN {}/{}  synced {}",
                    ch.name,
                    m.owner,
                    ch.sequence,
                    ch.vitals.health.current,
                    ch.vitals.health.max,
                    ch.vitals.energy.current,
                    ch.vitals.energy.max,
                    ch.vitals.sanity.current,
                    ch.vitals.sanity.max,
                    m.synced_at.format("%Y-%m-%d %H:%M")
                );
            }
            println!("Sessions:");
            for s in &c.sessions {
                println!("  {}  {} [{}]", s.date.format("%Y-%m-%d"), s.title, s.clearance);
                println!("    {}", s.content);
            }
            println!("Dossiers:");
            for d in &c.dossiers {
                let threat = d.threat_level.map(|t| format!(" threat {}", t)).unwrap_or_default();
                let id_short: String = d.id.chars().take(8).collect();
                println!("  {} {} ({}, {}){}", id_short, d.name, d.kind, d.status, threat);
            }
            if !c.evidence.is_empty() {
                println!("Evidence:\n{}", c.evidence);
            }
        }
        CampaignCommand::Log {
            id,
            title,
            content,
            clearance,
        } => {
            let clearance: Clearance = clearance.parse()?;
            let log = book.add_session_log(&user, &id, &title, &content, clearance)?;
            println!("Logged \"{}\".", log.title);
        }
        CampaignCommand::Dossier {
            id,
            name,
            kind,
            description,
            threat,
        } => {
            let kind: EntityKind = kind.parse()?;
            let d = book.add_dossier(&user, &id, &name, kind, &description, threat)?;
            println!("Added dossier {} [{}].", d.name, d.id);
        }
        CampaignCommand::DossierStatus { id, dossier, status } => {
            let status: EntityStatus = status.parse()?;
            book.set_dossier_status(&user, &id, &dossier, status)?;
            println!("Dossier marked {}.", status);
        }
        CampaignCommand::Evidence { id, text } => {
            book.set_evidence(&user, &id, &text)?;
            println!("Evidence board updated.");
        }
        CampaignCommand::Status { id, status } => {
            let status: CampaignStatus = status.parse()?;
            book.set_status(&user, &id, status)?;
            println!("Campaign is now {}.", status);
        }
        CampaignCommand::Invite {
            id,
            username,
            json_file,
        } => {
            let member = match json_file {
                Some(path) => {
                    let json = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path))?;
                    book.invite_json(&user, &id, &username, &json)?
                }
                None => book.invite(&user, &id, &username)?,
            };
            println!("{} joined with {}.", member.owner, member.character.name);
        }
        CampaignCommand::Sync { id } => {
            let report = book.refresh_party(&user, &id)?;
            println!("Synced {} member(s).", report.refreshed.len());
            if !report.missing.is_empty() {
                println!("No published character for: {}", report.missing.join(", "));
            }
        }
        CampaignCommand::Kick { id, username } => {
            if !app.confirm(&format!("Remove {} from the party?", username))? {
                println!("Cancelled.");
                return Ok(());
            }
            let m = book.remove_player(&user, &id, &username)?;
            println!("Removed {} ({}).", m.owner, m.character.name);
        }
        CampaignCommand::Leave { id } => {
            if !app.confirm("Leave this campaign?")? {
                println!("Cancelled.");
                return Ok(());
            }
            book.leave(&user, &id)?;
            println!("You left the campaign.");
        }
        CampaignCommand::Delete { id } => {
            let c = book.get(&id)?;
            if !app.confirm(&format!("Delete campaign {} permanently?", c.title))? {
                println!("Cancelled.");
                return Ok(());
            }
            book.delete(&user, &id)?;
            println!("Deleted {}.", c.title);
        }
    }
    Ok(())
}

fn cmd_friend(app: &App, command: FriendCommand) -> Result<()> {
    let user = app.acting_user()?;
    let registry = app.registry()?;
    match command {
        FriendCommand::Add { handle } => {
            let (name, tag) =
                split_name_tag(&handle).ok_or_else(|| anyhow!("expected name#12345, got {}", handle))?;
            registry.add_friend(&user, name, tag)?;
            println!("{} added.", handle);
        }
        FriendCommand::Remove { name } => {
            if !app.confirm(&format!("Remove {} from your friends?", name))? {
                println!("Cancelled.");
                return Ok(());
            }
            registry.remove_friend(&user, &name)?;
            println!("{} removed.", name);
        }
        FriendCommand::List => {
            let me = registry.get(&user)?;
            if me.friends.is_empty() {
                println!("No friends yet. Your handle is {}.", me.handle());
            }
            for f in &me.friends {
                println!("{}", f);
            }
        }
    }
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    let mut builder = env_logger::Builder::new();
    // CLI verbosity wins over the configured level
    let base_level = match (verbosity, config) {
        (0, Some(cfg)) => cfg.logging.level_filter(),
        (0, None) => log::LevelFilter::Info,
        (1, _) => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    // sled is chatty at debug
    builder.filter_module("sled", log::LevelFilter::Warn);

    let file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });
    let security_path = config.as_ref().and_then(|c| c.logging.security_file.clone());

    match file {
        Some(f) => {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            let is_tty = atty::is(atty::Stream::Stdout);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());

                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }

                if record.target() == "security" {
                    if let Some(ref sec_path) = security_path {
                        if let Ok(mut sf) = std::fs::OpenOptions::new()
                            .create(true)
                            .append(true)
                            .open(sec_path)
                        {
                            let _ = writeln!(sf, "{}", line);
                        }
                    }
                }

                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }
    let _ = builder.try_init();
}
