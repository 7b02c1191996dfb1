//! Fact-check email addresses.
//!
//! Editions out for fact-check are given a reply address that encodes the
//! deployment environment and the edition id. The environment is not
//! configured directly; it is read from the second label of the publisher
//! application's public host name, e.g. `preview` from
//! `https://publisher.preview.alphagov.co.uk`.

use regex::Regex;
use url::Url;

use crate::{Error, Result};

pub const DOMAIN: &str = "alphagov.co.uk";

/// Resolves the public base URL of a named application.
pub trait ServiceLocator {
  fn find(&self, service: &str) -> Result<Url>;
}

/// Locates `{scheme}://{service}.{app_domain}`.
#[derive(Debug, Clone)]
pub struct DomainServiceLocator {
  pub scheme:     String,
  pub app_domain: String,
}

impl ServiceLocator for DomainServiceLocator {
  fn find(&self, service: &str) -> Result<Url> {
    Ok(Url::parse(&format!(
      "{}://{service}.{}",
      self.scheme,
      self.app_domain.trim_matches('.')
    ))?)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactCheckAddress {
  environment: String,
}

impl FactCheckAddress {
  pub fn new(locator: &impl ServiceLocator) -> Result<Self> {
    let url = locator.find("publisher")?;
    let environment = url
      .host_str()
      .and_then(|host| host.split('.').nth(1))
      .filter(|env| !env.is_empty())
      .ok_or_else(|| Error::Environment(url.to_string()))?;
    Ok(Self::for_environment(environment))
  }

  pub fn for_environment(environment: &str) -> Self {
    Self { environment: environment.to_owned() }
  }

  pub fn environment(&self) -> &str { &self.environment }

  fn prefix(&self) -> String { format!("factcheck+{}-", self.environment) }

  /// The reply address for an edition.
  pub fn for_edition(&self, edition_id: impl std::fmt::Display) -> String {
    format!("{}{edition_id}@{DOMAIN}", self.prefix())
  }

  /// Matches an inbound address; capture group 1 is the edition id.
  pub fn regex(&self) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
      "{}(.+?)@{}",
      regex::escape(&self.prefix()),
      regex::escape(DOMAIN)
    ))
  }

  /// The edition id encoded in `address`, if it is one of ours.
  pub fn edition_id<'a>(&self, address: &'a str) -> Option<&'a str> {
    self
      .regex()
      .ok()?
      .captures(address)
      .and_then(|c| c.get(1))
      .map(|m| m.as_str())
  }
}
