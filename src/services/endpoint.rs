use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::collections::HashMap;
use std::env;
use url::Url;

fn expand_env_with(s: &str, env_map: &HashMap<String, String>) -> String {
    // ${VAR} from the environment; unknown variables expand to nothing
    let re = Regex::new(r"\$\{([A-Z0-9_]+)\}").expect("static regex");
    re.replace_all(s, |caps: &regex::Captures| {
        env_map.get(&caps[1]).cloned().unwrap_or_default()
    })
    .to_string()
}

pub fn expand_env(s: &str) -> String {
    let env_map: HashMap<String, String> = env::vars().collect();
    expand_env_with(s, &env_map)
}

/// Server locations for one bot. The bot name is the first path segment under
/// the server base, as in `{server}/{botname}/structuredInput`.
#[derive(Debug, Clone)]
pub struct Endpoints {
    bot_base: Url,
}

impl Endpoints {
    pub fn new(server: &str, botname: &str) -> Result<Self> {
        let expanded = expand_env(server);
        let mut base =
            Url::parse(&expanded).with_context(|| format!("parsing server url {expanded:?}"))?;
        base.path_segments_mut()
            .map_err(|_| anyhow!("server url {expanded:?} cannot be used as a base"))?
            .pop_if_empty()
            .push(botname)
            .push("");
        Ok(Self { bot_base: base })
    }

    fn join(&self, path: &str) -> Result<Url> {
        self.bot_base
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("joining {path:?} onto {}", self.bot_base))
    }

    pub fn structured_input(&self) -> Result<Url> {
        self.join("structuredInput")
    }

    pub fn message(&self) -> Result<Url> {
        self.join("message")
    }

    pub fn history(&self, path: &str) -> Result<Url> {
        self.join(path)
    }
}
