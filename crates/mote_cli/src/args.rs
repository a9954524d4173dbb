use clap::Parser;
use mote_runtime::VmConfig;

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "mote", version, about = "Small-footprint Java virtual machine", long_about = None)]
pub struct Cli {
    /// Class path searched for system classes
    #[arg(long, value_name = "PATH")]
    pub bootclasspath: Option<String>,

    /// Class path searched for application classes
    #[arg(long, visible_alias = "cp", value_name = "PATH")]
    pub classpath: Option<String>,

    /// Initial heap size, in bytes or with a k/m suffix
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub heap_min: Option<usize>,

    /// Maximum heap size, in bytes or with a k/m suffix
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub heap_max: Option<usize>,

    #[arg(long, visible_alias = "ea", overrides_with = "disable_assertions")]
    pub enable_assertions: bool,

    #[arg(long, visible_alias = "da", overrides_with = "enable_assertions")]
    pub disable_assertions: bool,

    /// Treat an uncaught exception as a fatal VM error
    #[arg(long)]
    pub exit_on_uncaught_exception: bool,

    /// VM home directory
    #[arg(long, value_name = "DIR")]
    pub home: Option<String>,

    /// Connect to a debugger at HOST:PORT before running the main class
    #[arg(long, value_name = "HOST:PORT")]
    pub jdwp: Option<String>,

    #[arg(value_name = "MAINCLASS")]
    pub main_class: String,

    /// Arguments passed to the main class
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

/// Parses `1024`, `64k` or `16m` into bytes.
pub fn parse_size(s: &str) -> Result<usize, String> {
    let s = s.trim();
    let (digits, scale) = match s.char_indices().last() {
        Some((i, 'k' | 'K')) => (&s[..i], 1024),
        Some((i, 'm' | 'M')) => (&s[..i], 1024 * 1024),
        _ => (s, 1),
    };
    let n: usize = digits.parse().map_err(|_| format!("invalid size: {s}"))?;
    n.checked_mul(scale).ok_or_else(|| format!("size out of range: {s}"))
}

impl Cli {
    /// Builds the VM configuration. `env_classpath` stands in for a missing
    /// `--classpath`.
    pub fn to_config(&self, env_classpath: Option<&str>) -> VmConfig {
        let defaults = VmConfig::default();
        let class_path = self.classpath.as_deref().or(env_classpath).map(VmConfig::split_class_path);
        VmConfig {
            heap_min: self.heap_min.unwrap_or(defaults.heap_min),
            heap_max: self.heap_max.unwrap_or(defaults.heap_max),
            assertions: self.enable_assertions && !self.disable_assertions,
            exit_on_uncaught_exception: self.exit_on_uncaught_exception,
            boot_class_path: self.bootclasspath.as_deref().map(VmConfig::split_class_path).unwrap_or_default(),
            class_path: class_path.unwrap_or_default(),
            home: self.home.clone(),
            ..defaults
        }
    }

    /// The main class in internal form (`demo/Main`).
    pub fn main_class_name(&self) -> String {
        self.main_class.replace('.', "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("mote").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn sizes_accept_suffixes() {
        assert_eq!(parse_size("4096"), Ok(4096));
        assert_eq!(parse_size("64k"), Ok(64 * 1024));
        assert_eq!(parse_size("2M"), Ok(2 * 1024 * 1024));
        assert!(parse_size("lots").is_err());
        assert!(parse_size("k").is_err());
    }

    #[test]
    fn options_fill_the_config() {
        let cli = parse(&["--cp", "lib:app", "--heap-max", "1m", "--ea", "demo.Main", "-x", "y"]);
        assert_eq!(cli.main_class_name(), "demo/Main");
        assert_eq!(cli.args, vec!["-x", "y"]);
        let config = cli.to_config(None);
        assert_eq!(config.heap_max, 1024 * 1024);
        assert!(config.assertions);
        if cfg!(unix) {
            assert_eq!(config.class_path, vec!["lib", "app"]);
        }
    }

    #[test]
    fn last_assertion_flag_wins() {
        let cli = parse(&["--enable-assertions", "--disable-assertions", "Main"]);
        assert!(!cli.to_config(None).assertions);
    }

    #[test]
    fn environment_class_path_is_a_fallback() {
        let cli = parse(&["Main"]);
        assert_eq!(cli.to_config(Some("env")).class_path, vec!["env"]);
        let cli = parse(&["--classpath", "flag", "Main"]);
        assert_eq!(cli.to_config(Some("env")).class_path, vec!["flag"]);
    }
}
