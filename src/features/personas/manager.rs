//! # Feature: Persona System
//!
//! Named system prompts the active backend can be switched to. Prompts are
//! loaded from prompt/*.md at compile time. The implicit `standard` persona
//! carries no prompt override and is reached by resetting the backend.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Personas drive the active chat backend (reset / system prompt swap) instead of per-request prompts
//! - 1.3.0: Added noir, zen and dev personas
//! - 1.0.0: Initial release with analyst, chef and teacher

use crate::core::error::PersonaError;
use crate::features::backend::ActiveBackend;
use log::info;
use rand::seq::IndexedRandom;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

pub const STANDARD_PERSONA: &str = "standard";
pub const RANDOM_PERSONA: &str = "random";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub id: String,
    pub name: String,
    pub description: String,
    pub system_prompt: String,
}

impl Persona {
    pub fn new(id: &str, name: &str, description: &str, system_prompt: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            system_prompt: system_prompt.trim().to_string(),
        }
    }
}

/// Read-only set of non-standard personas
#[derive(Debug, Clone, Default)]
pub struct PersonaCatalog {
    personas: BTreeMap<String, Persona>,
}

impl PersonaCatalog {
    pub fn builtin() -> Self {
        Self::from_personas(vec![
            Persona::new(
                "analyst",
                "Step-by-Step Analyst",
                "Breaks every problem into numbered steps",
                include_str!("../../../prompt/analyst.md"),
            ),
            Persona::new(
                "chef",
                "Chef",
                "A passionate chef who shares recipes and cooking wisdom",
                include_str!("../../../prompt/chef.md"),
            ),
            Persona::new(
                "dev",
                "Developer",
                "A senior engineer who answers with working code",
                include_str!("../../../prompt/dev.md"),
            ),
            Persona::new(
                "noir",
                "Noir Detective",
                "A hard-boiled 1940s detective who treats every question like a case",
                include_str!("../../../prompt/noir.md"),
            ),
            Persona::new(
                "teacher",
                "Teacher",
                "A patient teacher who explains things clearly",
                include_str!("../../../prompt/teacher.md"),
            ),
            Persona::new(
                "zen",
                "Zen Master",
                "A contemplative sage with calm, brief answers",
                include_str!("../../../prompt/zen.md"),
            ),
        ])
    }

    /// `standard` and `random` are reserved and never enter the catalog
    pub fn from_personas(personas: Vec<Persona>) -> Self {
        let personas = personas
            .into_iter()
            .filter(|p| p.id != STANDARD_PERSONA && p.id != RANDOM_PERSONA)
            .map(|p| (p.id.clone(), p))
            .collect();
        Self { personas }
    }

    pub fn get(&self, id: &str) -> Option<&Persona> {
        self.personas.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.personas.keys().map(String::as_str)
    }

    pub fn list(&self) -> impl Iterator<Item = &Persona> {
        self.personas.values()
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    /// Uniform pick among the catalog ids
    pub fn random_id(&self) -> Option<String> {
        let ids: Vec<&String> = self.personas.keys().collect();
        ids.choose(&mut rand::rng()).map(|id| id.to_string())
    }
}

/// Outcome of a persona switch request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonaSwitch {
    AlreadyActive(String),
    Switched(String),
}

#[derive(Debug)]
pub struct PersonaManager {
    catalog: PersonaCatalog,
    current: RwLock<String>,
}

impl Default for PersonaManager {
    fn default() -> Self {
        Self::new(PersonaCatalog::builtin())
    }
}

impl PersonaManager {
    pub fn new(catalog: PersonaCatalog) -> Self {
        Self {
            catalog,
            current: RwLock::new(STANDARD_PERSONA.to_string()),
        }
    }

    pub fn catalog(&self) -> &PersonaCatalog {
        &self.catalog
    }

    pub fn current(&self) -> String {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record the active persona after the backend was changed elsewhere
    /// (reset, model switch)
    pub(crate) fn set_current(&self, id: &str) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = id.to_string();
    }

    /// Switch the active backend to `requested`.
    ///
    /// The backend lock is held for the whole switch, so it waits for any
    /// in-flight reply and nothing else touches the backend meanwhile. On any
    /// failure the current persona is left as it was.
    pub async fn switch(
        &self,
        backend: &ActiveBackend,
        requested: &str,
    ) -> Result<PersonaSwitch, PersonaError> {
        let requested = requested.trim().to_lowercase();
        let mut active = backend.lock().await;

        let current = self.current();
        if requested == current {
            return Ok(PersonaSwitch::AlreadyActive(current));
        }

        if requested == STANDARD_PERSONA {
            active.reset().await?;
            self.set_current(STANDARD_PERSONA);
            info!("Persona switched {current} -> {STANDARD_PERSONA}");
            return Ok(PersonaSwitch::Switched(STANDARD_PERSONA.to_string()));
        }

        let target = if requested == RANDOM_PERSONA {
            self.catalog
                .random_id()
                .ok_or_else(|| PersonaError::Unknown(requested.clone()))?
        } else {
            requested
        };

        let persona = self
            .catalog
            .get(&target)
            .ok_or_else(|| PersonaError::Unknown(target.clone()))?;

        let replacement = active.with_system_prompt(&persona.system_prompt).await?;
        *active = replacement;
        self.set_current(&persona.id);
        info!("Persona switched {current} -> {}", persona.id);

        Ok(PersonaSwitch::Switched(persona.id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::BackendError;
    use crate::features::backend::{ChatBackend, ChatModel};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Calls {
        resets: AtomicUsize,
        prompts: AtomicUsize,
        fail_prompt: AtomicBool,
    }

    struct CountingBackend {
        calls: Arc<Calls>,
        prompt: String,
    }

    #[async_trait]
    impl ChatBackend for CountingBackend {
        fn model(&self) -> ChatModel {
            ChatModel::ApiKey
        }

        async fn generate_reply(&mut self, text: &str) -> Result<String, BackendError> {
            Ok(format!("{}|{text}", self.prompt))
        }

        async fn reset(&mut self) -> Result<(), BackendError> {
            self.calls.resets.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn with_system_prompt(&self, prompt: &str) -> Result<Box<dyn ChatBackend>, BackendError> {
            self.calls.prompts.fetch_add(1, Ordering::SeqCst);
            if self.calls.fail_prompt.load(Ordering::SeqCst) {
                return Err(BackendError::transport("down"));
            }
            Ok(Box::new(CountingBackend {
                calls: self.calls.clone(),
                prompt: prompt.to_string(),
            }))
        }
    }

    fn setup() -> (PersonaManager, ActiveBackend, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let backend: ActiveBackend = Mutex::new(Box::new(CountingBackend {
            calls: calls.clone(),
            prompt: String::new(),
        }));
        let catalog = PersonaCatalog::from_personas(vec![
            Persona::new("chef", "Chef", "cooks", "You cook."),
            Persona::new("zen", "Zen", "calm", "You are calm."),
        ]);
        (PersonaManager::new(catalog), backend, calls)
    }

    #[test]
    fn test_builtin_catalog_loaded() {
        let catalog = PersonaCatalog::builtin();
        assert_eq!(catalog.len(), 6);
        for persona in catalog.list() {
            assert!(!persona.system_prompt.is_empty(), "{} has no prompt", persona.id);
            assert!(!persona.name.is_empty());
        }
        assert!(catalog.get(STANDARD_PERSONA).is_none());
    }

    #[test]
    fn test_reserved_ids_filtered() {
        let catalog = PersonaCatalog::from_personas(vec![
            Persona::new("standard", "x", "x", "x"),
            Persona::new("random", "x", "x", "x"),
            Persona::new("chef", "x", "x", "x"),
        ]);
        assert_eq!(catalog.ids().collect::<Vec<_>>(), vec!["chef"]);
    }

    #[test]
    fn test_random_id_stays_in_catalog() {
        let catalog = PersonaCatalog::builtin();
        for _ in 0..50 {
            let id = catalog.random_id().unwrap();
            assert!(catalog.get(&id).is_some());
        }
        assert!(PersonaCatalog::default().random_id().is_none());
    }

    #[tokio::test]
    async fn test_switch_to_current_is_noop() {
        let (manager, backend, calls) = setup();
        let outcome = manager.switch(&backend, "standard").await.unwrap();
        assert_eq!(outcome, PersonaSwitch::AlreadyActive("standard".to_string()));
        assert_eq!(calls.resets.load(Ordering::SeqCst), 0);
        assert_eq!(calls.prompts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_switch_to_catalog_persona_replaces_backend() {
        let (manager, backend, calls) = setup();
        let outcome = manager.switch(&backend, "Chef").await.unwrap();
        assert_eq!(outcome, PersonaSwitch::Switched("chef".to_string()));
        assert_eq!(manager.current(), "chef");
        assert_eq!(calls.prompts.load(Ordering::SeqCst), 1);

        let reply = backend.lock().await.generate_reply("hi").await.unwrap();
        assert_eq!(reply, "You cook.|hi");

        // Same persona again does nothing
        let again = manager.switch(&backend, "chef").await.unwrap();
        assert_eq!(again, PersonaSwitch::AlreadyActive("chef".to_string()));
        assert_eq!(calls.prompts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_standard_from_catalog_resets_once() {
        let (manager, backend, calls) = setup();
        manager.switch(&backend, "zen").await.unwrap();
        let outcome = manager.switch(&backend, "standard").await.unwrap();
        assert_eq!(outcome, PersonaSwitch::Switched("standard".to_string()));
        assert_eq!(calls.resets.load(Ordering::SeqCst), 1);
        assert_eq!(manager.current(), STANDARD_PERSONA);
    }

    #[tokio::test]
    async fn test_random_picks_catalog_persona() {
        let (manager, backend, calls) = setup();
        let outcome = manager.switch(&backend, "random").await.unwrap();
        let PersonaSwitch::Switched(id) = outcome else {
            panic!("random should switch");
        };
        assert!(id == "chef" || id == "zen");
        assert_eq!(manager.current(), id);
        assert_eq!(calls.prompts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_persona_leaves_state() {
        let (manager, backend, calls) = setup();
        let err = manager.switch(&backend, "pirate").await.unwrap_err();
        assert!(matches!(err, PersonaError::Unknown(ref id) if id == "pirate"));
        assert_eq!(manager.current(), STANDARD_PERSONA);
        assert_eq!(calls.prompts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_switch_keeps_persona_and_backend() {
        let (manager, backend, calls) = setup();
        manager.switch(&backend, "zen").await.unwrap();
        calls.fail_prompt.store(true, Ordering::SeqCst);

        let err = manager.switch(&backend, "chef").await.unwrap_err();
        assert!(matches!(err, PersonaError::Backend(_)));
        assert_eq!(manager.current(), "zen");

        let reply = backend.lock().await.generate_reply("hi").await.unwrap();
        assert_eq!(reply, "You are calm.|hi");
    }
}
