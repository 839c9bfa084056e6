use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use binprov_backend::{ProviderKind, ProviderRegistry};
use binprov_core::{BinName, BinProvider, Binary, ShallowBinary};
use serde::Serialize;

use crate::cli::{BinArg, Commands, LoadArg};
use crate::config::Settings;
use crate::table::{AnswerRow, Formatter, ProviderRow};

pub struct Ctx {
    pub settings: Settings,
    pub json: bool,
}

impl Ctx {
    pub fn run(&self, cmd: Commands) -> Result<()> {
        match cmd {
            Commands::Load(arg) => self.load(arg),
            Commands::Install(arg) => {
                let record = self.binary(&arg)?.install()?;
                self.print_record(&record)
            }
            Commands::LoadOrInstall(arg) => {
                let record = self.binary(&arg)?.load_or_install()?;
                self.print_record(&record)
            }
            Commands::Abspath(arg) => self.inspect(&arg, |provider, bin| {
                Ok(provider.get_abspath(bin)?.map(|p| p.display().to_string()))
            }),
            Commands::Version(arg) => self.inspect(&arg, |provider, bin| {
                Ok(provider.get_version(bin)?.map(|v| v.to_string()))
            }),
            Commands::Packages(arg) => self.inspect(&arg, |provider, bin| {
                Ok(Some(provider.get_packages(bin)?.packages().join(" ")))
            }),
            Commands::Providers => self.providers(),
        }
    }

    /// The providers named on the command line, or the configured ones.
    fn registry(&self, names: &[String]) -> Result<ProviderRegistry> {
        let kinds = if names.is_empty() {
            self.settings.kinds()?
        } else {
            names
                .iter()
                .map(|name| name.parse::<ProviderKind>())
                .collect::<binprov_backend::Result<Vec<_>>>()?
        };
        Ok(ProviderRegistry::with_kinds(kinds, &self.settings.backend_config())?)
    }

    fn binary(&self, arg: &BinArg) -> Result<Binary> {
        let name = BinName::new(arg.bin.as_str())?;
        let registry = self.registry(&arg.providers)?;
        Ok(registry.binary::<&str>(name, &[])?)
    }

    fn load(&self, arg: LoadArg) -> Result<()> {
        let binary = self.binary(&arg.target)?;
        let Some(record) = binary.load_with_cache(!arg.no_cache)? else {
            let providers: Vec<_> = binary.provider_names().map(|n| n.to_string()).collect();
            bail!("{} was not found by any of: {}", binary.name(), providers.join(", "));
        };
        self.print_record(&record)
    }

    fn inspect<F>(&self, arg: &BinArg, query: F) -> Result<()>
    where
        F: Fn(&BinProvider, &BinName) -> binprov_core::Result<Option<String>>,
    {
        let name = BinName::new(arg.bin.as_str())?;
        let registry = self.registry(&arg.providers)?;

        let mut rows = Vec::with_capacity(registry.len());
        for provider in registry.iter() {
            let value = query(provider.as_ref(), &name)
                .with_context(|| format!("{} failed to answer for {name}", provider.name()))?;
            rows.push(Answer {
                provider: provider.name().to_string(),
                value,
            });
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&rows)?);
            return Ok(());
        }
        let table = Formatter {
            header: Some(name.to_string()),
            ..Default::default()
        }
        .build(rows.into_iter().map(AnswerRow::from));
        println!("{table}");
        Ok(())
    }

    fn providers(&self) -> Result<()> {
        let registry = self.registry(&[])?;
        if self.json {
            let list: Vec<_> = registry.iter().map(|p| ProviderInfo::from(p.as_ref())).collect();
            println!("{}", serde_json::to_string_pretty(&list)?);
            return Ok(());
        }
        let table = Formatter::default().build(registry.iter().map(|p| ProviderRow::from(p.as_ref())));
        println!("{table}");
        Ok(())
    }

    fn print_record(&self, record: &ShallowBinary) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(record)?);
        } else {
            println!("{record}");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
struct Answer {
    provider: String,
    value: Option<String>,
}

impl From<Answer> for AnswerRow {
    fn from(answer: Answer) -> Self {
        Self {
            provider: answer.provider,
            value: answer.value.unwrap_or_else(|| String::from("-")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ProviderInfo {
    name: String,
    installer: String,
    installer_abspath: Option<PathBuf>,
    valid: bool,
    search_path: Vec<PathBuf>,
}

impl From<&BinProvider> for ProviderInfo {
    fn from(provider: &BinProvider) -> Self {
        Self {
            name: provider.name().to_string(),
            installer: provider.installer().to_string(),
            installer_abspath: provider.installer_abspath().map(PathBuf::from),
            valid: provider.is_valid(),
            search_path: provider.search_path().iter().map(PathBuf::from).collect(),
        }
    }
}
