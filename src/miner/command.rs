use crate::error::AppError;
use serde::Serialize;

/// A pool command template such as `ccminer -a x17 -u WALLETADDRESS -o stratum+tcp://...`.
///
/// The template is split into arguments once, at configure time. The wallet
/// address is substituted per argument at launch, so an address is never
/// re-split on whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinerCommand {
    template: String,
    placeholder: String,
    words: Vec<String>,
}

/// Concrete argument vector for one launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl MinerCommand {
    pub fn parse(template: &str, placeholder: &str) -> Result<Self, AppError> {
        if placeholder.is_empty() {
            return Err(AppError::InvalidTemplate("placeholder token is empty".into()));
        }
        if !template.contains(placeholder) {
            return Err(AppError::InvalidTemplate(format!(
                "template does not contain {placeholder}"
            )));
        }
        let words = shlex::split(template).ok_or_else(|| {
            AppError::InvalidTemplate("unbalanced quotes or trailing escape".into())
        })?;
        if words.is_empty() {
            return Err(AppError::InvalidTemplate("template is empty".into()));
        }

        Ok(Self {
            template: template.to_string(),
            placeholder: placeholder.to_string(),
            words,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Builds a fresh argument vector with the placeholder replaced by `address`.
    pub fn resolve(&self, address: &str) -> ResolvedCommand {
        let mut words = self
            .words
            .iter()
            .map(|word| word.replace(&self.placeholder, address));
        // parse() guarantees at least one word
        let program = words.next().unwrap_or_default();
        ResolvedCommand {
            program,
            args: words.collect(),
        }
    }
}

impl ResolvedCommand {
    /// Printable command line, quoted so it splits back into the same arguments.
    pub fn command_line(&self) -> String {
        let words = std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str));
        shlex::try_join(words).unwrap_or_else(|_| {
            let mut line = self.program.clone();
            for arg in &self.args {
                line.push(' ');
                line.push_str(arg);
            }
            line
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLACEHOLDER: &str = "WALLETADDRESS";

    #[test]
    fn test_substitutes_address() {
        let cmd = MinerCommand::parse("miner.exe -o WALLETADDRESS -a x17", PLACEHOLDER).unwrap();
        let resolved = cmd.resolve("V1abc");

        assert_eq!(resolved.program, "miner.exe");
        assert_eq!(resolved.args, vec!["-o", "V1abc", "-a", "x17"]);
        assert_eq!(resolved.command_line(), "miner.exe -o V1abc -a x17");
    }

    #[test]
    fn test_template_is_not_mutated_between_launches() {
        let cmd = MinerCommand::parse("miner -u WALLETADDRESS.rig1", PLACEHOLDER).unwrap();

        assert_eq!(cmd.resolve("first").args, vec!["-u", "first.rig1"]);
        assert_eq!(cmd.resolve("second").args, vec!["-u", "second.rig1"]);
        assert_eq!(cmd.template(), "miner -u WALLETADDRESS.rig1");
    }

    #[test]
    fn test_missing_placeholder_is_invalid() {
        let err = MinerCommand::parse("miner -o pool:3333", PLACEHOLDER).unwrap_err();
        assert!(matches!(err, AppError::InvalidTemplate(_)));
    }

    #[test]
    fn test_unbalanced_quotes_fail_loudly() {
        let err = MinerCommand::parse("miner -u 'WALLETADDRESS", PLACEHOLDER).unwrap_err();
        assert!(matches!(err, AppError::InvalidTemplate(_)));
    }

    #[test]
    fn test_quoted_arguments_and_spaced_address_stay_whole() {
        let cmd =
            MinerCommand::parse("miner --name \"my rig\" -u WALLETADDRESS", PLACEHOLDER).unwrap();
        let resolved = cmd.resolve("has space");

        assert_eq!(resolved.args, vec!["--name", "my rig", "-u", "has space"]);
        let reparsed = shlex::split(&resolved.command_line()).unwrap();
        assert_eq!(reparsed, vec!["miner", "--name", "my rig", "-u", "has space"]);
    }
}
