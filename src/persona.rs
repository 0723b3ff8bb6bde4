use serde::{Deserialize, Serialize};

/// Chatbot personality the backend should answer in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    #[default]
    Singlish,
    Xmm,
    AhBeng,
    Nsf,
}

/// Display metadata for a persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersonaInfo {
    pub persona: Persona,
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
}

/// Lookup table for the closed persona set, in sidebar order.
pub const PERSONAS: [PersonaInfo; 4] = [
    PersonaInfo {
        persona: Persona::Singlish,
        id: "singlish",
        name: "Singlish",
        icon: "🇸🇬",
        description: "Friendly Singaporean assistant",
    },
    PersonaInfo {
        persona: Persona::Xmm,
        id: "xmm",
        name: "XMM",
        icon: "💁",
        description: "XMM personality chatbot",
    },
    PersonaInfo {
        persona: Persona::AhBeng,
        id: "ahbeng",
        name: "Ah Beng",
        icon: "😎",
        description: "Classic Ah Beng style",
    },
    PersonaInfo {
        persona: Persona::Nsf,
        id: "nsf",
        name: "NSF",
        icon: "🎖",
        description: "National Serviceman persona",
    },
];

impl Persona {
    pub fn info(&self) -> &'static PersonaInfo {
        // The table is indexed in declaration order.
        &PERSONAS[self.index()]
    }

    pub fn as_str(&self) -> &'static str {
        self.info().id
    }

    pub fn display_name(&self) -> &'static str {
        self.info().name
    }

    pub fn index(&self) -> usize {
        match self {
            Persona::Singlish => 0,
            Persona::Xmm => 1,
            Persona::AhBeng => 2,
            Persona::Nsf => 3,
        }
    }

    /// Looks up a persona by wire id, ignoring case and surrounding whitespace.
    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim().to_lowercase();
        PERSONAS.iter().find(|info| info.id == id).map(|info| info.persona)
    }

    pub fn all() -> Vec<Persona> {
        PERSONAS.iter().map(|info| info.persona).collect()
    }

    pub fn from_index(index: usize) -> Option<Self> {
        PERSONAS.get(index).map(|info| info.persona)
    }
}

impl std::fmt::Display for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Persona {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Persona::from_id(s).ok_or_else(|| {
            let known: Vec<&str> = PERSONAS.iter().map(|info| info.id).collect();
            format!("unknown persona '{}' (expected one of: {})", s, known.join(", "))
        })
    }
}
