use crate::domain::ContentSource;
use crate::errors::ContentError;
use crate::models::{Caption, MemeBatch, MemeText};
use async_trait::async_trait;
use rand::seq::SliceRandom;

const PISCES_MEMES: &[&str] = &[
    "Pisces: cries in the shower\nso no one can tell",
    "POV: Pisces just felt\na vibe shift",
    "Pisces avoiding confrontation\nlike it's their job",
    "Pisces: I'm fine\n(currently having an\nexistential crisis)",
    "Pisces checking their\nhoroscope 47 times today",
    "Pisces when someone asks\nhow they're doing: lying",
    "Pisces daydreaming about\na life they don't have",
    "Pisces: emotionally unavailable\nbut also desperate for love",
    "Pisces ghosting everyone\nincluding themselves",
    "Pisces processing emotions\nat 3am",
    "Pisces: I need alone time\n(proceeds to feel lonely)",
    "Pisces overthinking a\nconversation from 2019",
    "Pisces listening to\nsad music on purpose",
    "Pisces: master manipulator\n(of their own emotions)",
    "Pisces pretending they\ndon't care\n(they care so much)",
    "Pisces having a mental\nbreakdown in the most\nchill way possible",
    "Pisces: too empathetic\nfor this world",
    "Pisces reading into texts\nthat don't exist",
    "Pisces disappearing\nfor no reason",
    "Pisces: I'll manifest it\n(takes no action)",
    "Pisces crying over\nsomething beautiful they saw",
    "Pisces feeling everyone's\nemotions except their own",
    "Pisces romanticizing\ntheir trauma",
    "Pisces needs therapy\nbut gets tarot instead",
    "Pisces living in their\nhead rent free",
    "Pisces: secretly\njudging everyone",
    "Pisces when reality hits:\nno thanks",
    "Pisces running away\nfrom responsibility",
    "Pisces being psychic about\neveryone except themselves",
    "Pisces: chronically online and\nemotionally offline",
    "Pisces vibing in their\nown little world",
    "Pisces canceling plans they\nnever wanted to make",
    "Pisces: I'm so over it\n(definitely not over it)",
    "Pisces self-sabotaging\nfor fun",
    "Pisces having a spiritual\nawakening at the grocery store",
    "Pisces: emotionally intelligent\nbut mentally a mess",
    "Pisces dreaming about a\nbetter life instead of living it",
    "Pisces taking everything\npersonally",
    "Pisces: the CEO of escapism",
    "Pisces making up scenarios\nthat will never happen",
    "Pisces pretending to be okay\nwhile dying inside",
    "Pisces: will ghostwrite your\nemotions for free",
    "Pisces dissociating\nin public places",
    "Pisces being dramatic\nabout the smallest things",
    "Pisces: I'm not sensitive\n(extremely sensitive)",
    "Pisces starting 10 projects\nand finishing none",
    "Pisces avoiding adulting\nat all costs",
    "Pisces: chronically tired\nbut can't sleep",
    "Pisces living in a fantasy\nworld to avoid reality",
    "Pisces being the therapist\nfriend (needs therapy)",
    "Pisces forgetting to respond\nfor 3 business days",
    "Pisces: master of\npassive aggression",
    "Pisces falling in love with\npotential, not reality",
    "Pisces creating problems\nthat don't exist yet",
    "Pisces having main character\nenergy in their head only",
    "Pisces: professional\noversharer then ghoster",
    "Pisces being intuitive about\neveryone except red flags",
    "Pisces collecting hobbies\nlike Pokémon cards",
    "Pisces: spiritually woke,\nmentally broke",
    "Pisces making everything\nabout the moon phase",
    "Pisces needs 8 hours of sleep\nand gets 3",
    "Pisces: commitment issues\nbut married to delusion",
    "Pisces overthinking while\npretending to be chill",
    "Pisces being cryptic\nfor no reason",
    "Pisces: silently judging\nyour energy",
    "Pisces living in their feels\n24/7/365",
];

const PISCES_CAPTIONS: &[&str] = &[
    "why am I like this 😭 #pisces #zodiac #astrology #memes",
    "pisces things ♓️ #piscesseason #zodiacmemes #astrologymemes",
    "tag a pisces 🐟 #pisces #zodiacsigns #horoscope",
    "POV: you're a pisces #astrology #pisces #relatable",
    "pisces energy 💙 #zodiac #pisces #meme",
];

/// Fixed meme and caption lists, sampled at random.
#[derive(Debug, Clone)]
pub struct StaticContentSource {
    memes: Vec<MemeText>,
    captions: Vec<Caption>,
}

impl StaticContentSource {
    /// At least one caption is required.
    pub fn new(memes: Vec<MemeText>, captions: Vec<Caption>) -> Option<Self> {
        if captions.is_empty() {
            return None;
        }
        Some(Self { memes, captions })
    }

    pub fn pisces() -> Self {
        Self {
            memes: PISCES_MEMES.iter().filter_map(|m| MemeText::new(*m)).collect(),
            captions: PISCES_CAPTIONS.iter().map(|c| Caption::new(*c)).collect(),
        }
    }

    /// `min(count, available)` distinct memes in random order.
    pub fn sample_memes(&self, count: usize) -> Vec<MemeText> {
        let mut rng = rand::thread_rng();
        self.memes.choose_multiple(&mut rng, count).cloned().collect()
    }

    pub fn pick_caption(&self) -> Caption {
        let mut rng = rand::thread_rng();
        self.captions
            .choose(&mut rng)
            .cloned()
            .unwrap_or_else(|| Caption::new(""))
    }

    pub fn batch(&self, count: usize) -> MemeBatch {
        MemeBatch { memes: self.sample_memes(count), caption: self.pick_caption() }
    }
}

#[async_trait]
impl ContentSource for StaticContentSource {
    async fn produce(&self, count: usize) -> Result<MemeBatch, ContentError> {
        let batch = self.batch(count);
        tracing::info!(memes = batch.memes.len(), "Using fallback memes");
        Ok(batch)
    }
}
