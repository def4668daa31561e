/// Compiled-in content: levels, mutations, host profiles and flavor text.
///
/// Pure data. Behavior lives in `effects` (what a mutation intercepts) and
/// `sim::level` (what a level spawns).

use super::effects::{EffectDuration, EffectKind};

// ── Scoring ──

pub const TARGET_SCORE: u32 = 10;
pub const HEAL_BONUS: u32 = 20;
pub const ABSORB_BONUS: u32 = 30;

pub const FIRST_MUTATION_SCORE: u32 = 30;
pub const MUTATION_SCORE_STEP: u32 = 50;
pub const OFFER_SIZE: usize = 3;

// ── Levels ──

#[derive(Clone, Copy, PartialEq, Eq, Debug, PartialOrd, Ord)]
pub enum LevelId {
    Circulatory = 1,
    Nervous = 2,
    Brain = 3,
}

pub struct LevelDef {
    pub name: &'static str,
    pub subtitle: &'static str,
    pub description: &'static str,
    pub required_score: u32,
}

pub static LEVELS: [LevelDef; 3] = [
    LevelDef {
        name: "Circulatory System",
        subtitle: "Red Is the New Black",
        description: "So many tunnels, so little oxygen. Welcome to the bloodstream, a glorified spaghetti system.",
        required_score: 0,
    },
    LevelDef {
        name: "Nervous System",
        subtitle: "Shock Therapy, But Worse",
        description: "Synapses. Sparks. Sudden death. The electrical system that powers existential dread.",
        required_score: 100,
    },
    LevelDef {
        name: "Brain System",
        subtitle: "The Final Infestation",
        description: "All roads lead to gray matter. It's damp, wrinkled, and somehow thinks it's the protagonist.",
        required_score: 250,
    },
];

impl LevelId {
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn def(self) -> &'static LevelDef {
        &LEVELS[self as usize - 1]
    }

    pub fn next(self) -> Option<LevelId> {
        match self {
            LevelId::Circulatory => Some(LevelId::Nervous),
            LevelId::Nervous => Some(LevelId::Brain),
            LevelId::Brain => None,
        }
    }

    /// Score needed to leave this level; `None` on the last level.
    pub fn next_threshold(self) -> Option<u32> {
        self.next().map(|n| n.def().required_score)
    }
}

// ── Mutations ──

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MutationId {
    SpineFangs,
    LeechLoop,
    CapillaryPhase,
    SynapticSkip,
    NeuroleechTendril,
    CaffeineGland,
    DreamParasite,
    NeuronLace,
    CortexMirage,
}

pub struct MutationDef {
    pub id: MutationId,
    pub name: &'static str,
    pub tagline: &'static str,
    pub summary: &'static str,
    pub icon: char,
    pub effect: EffectKind,
    pub duration: EffectDuration,
    /// Lowest level on which this mutation may be offered.
    pub level: LevelId,
}

pub static MUTATIONS: [MutationDef; 9] = [
    MutationDef {
        id: MutationId::SpineFangs,
        name: "Spine Fangs",
        tagline: "Perfect for breaking antibodies, and hearts.",
        summary: "Consume cells from behind your head.",
        icon: 'ᛉ',
        effect: EffectKind::RearConsumption,
        duration: EffectDuration::Permanent,
        level: LevelId::Circulatory,
    },
    MutationDef {
        id: MutationId::LeechLoop,
        name: "Leech Loop",
        tagline: "Self-harm becomes self-care.",
        summary: "Survive one self-collision and regain infection points.",
        icon: '∞',
        effect: EffectKind::CollisionHeal { bonus: HEAL_BONUS },
        duration: EffectDuration::Permanent,
        level: LevelId::Circulatory,
    },
    MutationDef {
        id: MutationId::CapillaryPhase,
        name: "Capillary Phase",
        tagline: "Reality is optional. Arterial walls are suggestions.",
        summary: "[SPACE] pass through walls and hazards briefly.",
        icon: '≈',
        effect: EffectKind::WallPhase { window_ms: 8000 },
        duration: EffectDuration::Permanent,
        level: LevelId::Circulatory,
    },
    MutationDef {
        id: MutationId::SynapticSkip,
        name: "Synaptic Skip",
        tagline: "Quantum tunneling for viruses.",
        summary: "Blink 2 spaces forward every 8 seconds.",
        icon: '»',
        effect: EffectKind::TeleportBurst { cells: 2, period_ms: 8000 },
        duration: EffectDuration::Permanent,
        level: LevelId::Nervous,
    },
    MutationDef {
        id: MutationId::NeuroleechTendril,
        name: "Neuroleech Tendril",
        tagline: "Emotional vampirism made manifest.",
        summary: "Absorb stunned enemies for bonus growth.",
        icon: 'Ψ',
        effect: EffectKind::AbsorbEnemies { bonus: ABSORB_BONUS },
        duration: EffectDuration::Permanent,
        level: LevelId::Nervous,
    },
    MutationDef {
        id: MutationId::CaffeineGland,
        name: "Caffeine Gland",
        tagline: "Speed over control. Just like the host.",
        summary: "Permanent speed boost from the next system on.",
        icon: '♨',
        effect: EffectKind::PermanentSpeed,
        duration: EffectDuration::Permanent,
        level: LevelId::Nervous,
    },
    MutationDef {
        id: MutationId::DreamParasite,
        name: "Dream Parasite",
        tagline: "Hijack their nightmares.",
        summary: "Freeze every enemy in place for 5 seconds.",
        icon: 'Ω',
        effect: EffectKind::MindControl,
        duration: EffectDuration::Timed(5000),
        level: LevelId::Brain,
    },
    MutationDef {
        id: MutationId::NeuronLace,
        name: "Neuron Lace",
        tagline: "Fractal infection patterns.",
        summary: "Grow in unpredictable bursts for extra length.",
        icon: '✱',
        effect: EffectKind::FractalGrowth { max_extra: 2 },
        duration: EffectDuration::Permanent,
        level: LevelId::Brain,
    },
    MutationDef {
        id: MutationId::CortexMirage,
        name: "Cortex Mirage",
        tagline: "Deception is the sincerest form of flattery.",
        summary: "A phantom clone distracts pursuing drones.",
        icon: '◊',
        effect: EffectKind::PhantomClone,
        duration: EffectDuration::Timed(15000),
        level: LevelId::Brain,
    },
];

impl MutationId {
    pub fn def(self) -> &'static MutationDef {
        MUTATIONS
            .iter()
            .find(|m| m.id == self)
            .expect("every MutationId has a table entry")
    }
}

/// Mutations that may be offered while on `level`.
pub fn offerable(level: LevelId) -> impl Iterator<Item = MutationId> {
    MUTATIONS.iter().filter(move |m| m.level <= level).map(|m| m.id)
}

// ── Hosts ──

/// Which variant of the consume sound a host uses.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum AudioVariant {
    ProteinPowder,
    CaffeineOverload,
    GoldPlated,
    PoliticalChaos,
}

pub struct HostProfile {
    pub name: &'static str,
    pub title: &'static str,
    pub intro: &'static str,
    pub thoughts: [&'static str; 4],
    pub audio: AudioVariant,
}

pub static HOSTS: [HostProfile; 4] = [
    HostProfile {
        name: "Brayden R.",
        title: "Lifestyle Influencer",
        intro: "Brayden believes detoxing cures trauma. Let's prove infection does too.",
        thoughts: [
            "Should I do a collab with toothpaste brands?",
            "Do lymph nodes have carbs?",
            "I wonder if sweat can be monetized.",
            "I should start another startup. This one's only mildly toxic.",
        ],
        audio: AudioVariant::ProteinPowder,
    },
    HostProfile {
        name: "Greg C.",
        title: "Middle Manager, Crypto Evangelist",
        intro: "Greg's body is mostly caffeine and market denial. Time to short his bloodstream.",
        thoughts: [
            "Buy the dip... of cholesterol.",
            "Am I the mitochondria of innovation?",
            "Let's disrupt the spleen!",
            "Pain is just inefficient UX.",
        ],
        audio: AudioVariant::CaffeineOverload,
    },
    HostProfile {
        name: "Tiffany L.",
        title: "Heiress, Corporate Cannibal",
        intro: "Her heart beats in lawsuits. Let's make it stop.",
        thoughts: [
            "Why is there no valet for this liver?",
            "I own 7 kidneys. Two are from tigers.",
            "Being evil is exhausting. Thank goodness I'm rich.",
            "Do viruses do PR?",
        ],
        audio: AudioVariant::GoldPlated,
    },
    HostProfile {
        name: "The Council of Rat Kings",
        title: "Mutated Politician Hive-Mind",
        intro: "Multiple minds. One coat. Countless violations.",
        thoughts: [
            "Democracy is just organized mold.",
            "I veto this antibody.",
            "Our tail is tangled with destiny.",
            "Tax the liver. Fund the claws.",
        ],
        audio: AudioVariant::PoliticalChaos,
    },
];

// ── Flavor text ──

pub static IDLE_LINES: [&str; 6] = [
    "This meatbag has no idea.",
    "So many cells, so little time.",
    "I'm not killing. I'm liberating tissue.",
    "Each globule brings me closer to peace.",
    "This host tastes like soda and regret.",
    "They gave up on the gym. I won't.",
];

pub static CONSUME_LINES: [&str; 5] = [
    "Delicious. Nutritious. Defenseless.",
    "One less antibody to worry about.",
    "The immune system weakens...",
    "Their resistance is futile.",
    "Mmm, white blood cells.",
];

pub static MUTATION_LINES: [&str; 5] = [
    "Evolution feels... tingly.",
    "Adapt. Infect. Repeat.",
    "New shape. Same goal.",
    "I now have spikes. Emotionally and physically.",
    "Mutation complete. Humanity doomed.",
];

pub static GAME_OVER_LINES: [&str; 4] = [
    "The host survives. Earth weeps.",
    "They'll post about this in a 5-paragraph tweet.",
    "Human: 1. Virus: Merciful.",
    "I failed. Capitalism wins.",
];

pub static NEUROPLASTICITY_LINES: [&str; 4] = [
    "Neural pathways are shifting...",
    "Gray matter reconfiguring. Fascinating.",
    "The maze thinks it can outsmart me.",
    "Neuroplasticity detected. Evolving strategy.",
];

pub static THOUGHT_BUBBLES: [&str; 6] = [
    "what if I'm not special?",
    "am I living my best life?",
    "did I leave the stove on?",
    "why do I exist?",
    "is this all there is?",
    "what's the point?",
];

pub const LINE_RUN_START: &str = "Beginning cellular infiltration of host...";
pub const LINE_PHASE: &str = "Phasing through matter. Reality is overrated.";
pub const LINE_ABSORB: &str = "Emotional vampirism complete. Delicious neural energy.";
pub const LINE_HEAL: &str = "Self-harm becomes self-care. Delicious.";
pub const LINE_PULSE: &str = "Electrical surge incoming. Orange warning, yellow death.";
pub const LINE_LEVEL: &str = "New tissue detected. Adapting infiltration protocols...";
pub const LINE_SKIP: &str = "Synaptic skip. Blink and you'll miss me.";

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn level_table_is_ordered_and_indexed() {
        for (i, id) in [LevelId::Circulatory, LevelId::Nervous, LevelId::Brain].into_iter().enumerate() {
            assert_eq!(id.number() as usize, i + 1);
            assert!(std::ptr::eq(id.def(), &LEVELS[i]));
        }
        assert!(LEVELS.windows(2).all(|w| w[0].required_score < w[1].required_score));
    }

    #[test]
    fn next_threshold_is_stable() {
        assert_eq!(LevelId::Circulatory.next_threshold(), Some(100));
        assert_eq!(LevelId::Circulatory.next_threshold(), Some(100));
        assert_eq!(LevelId::Nervous.next_threshold(), Some(250));
        assert_eq!(LevelId::Brain.next_threshold(), None);
    }

    #[test]
    fn every_mutation_id_resolves_uniquely() {
        let ids: HashSet<_> = MUTATIONS.iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), MUTATIONS.len());
        for m in &MUTATIONS {
            assert_eq!(m.id.def().name, m.name);
        }
    }

    #[test]
    fn offer_pool_grows_with_level() {
        assert_eq!(offerable(LevelId::Circulatory).count(), 3);
        assert_eq!(offerable(LevelId::Nervous).count(), 6);
        assert_eq!(offerable(LevelId::Brain).count(), 9);
        assert!(offerable(LevelId::Circulatory).all(|id| id.def().level == LevelId::Circulatory));
    }
}
