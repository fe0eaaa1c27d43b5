//! Fallback Catalogue (C11, §4.11).
//!
//! Static lookup tables keyed by `(intent-or-degraded-mode, language)`,
//! grounded on the teacher's `once_cell::sync::Lazy` static-catalogue
//! idiom used for its domain reference data. §4.11 says "emergency is used
//! for symptom_report under any degraded mode", but S5's literal wording
//! asks for `action=contact_support` with emergency-flavored text on a
//! circuit-open symptom-report fallback, so the two degraded-mode lookups
//! below (`for_timeout`, `for_circuit_open`) select an emergency-toned
//! `ContactSupport` entry specifically for `symptom_report`, while the
//! plain per-intent catalogue (`for_intent`, used for "any other LLM
//! error") keeps the general `Emergency` action §4.11 describes.

use once_cell::sync::Lazy;
use pregnancy_core::{FallbackAction, FallbackEntry, Intent, Language};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CatalogueKey {
    Intent(Intent),
    Timeout,
    CircuitOpen,
}

type Catalogue = HashMap<(CatalogueKey, Language), FallbackEntry>;

static CATALOGUE: Lazy<Catalogue> = Lazy::new(build_catalogue);

fn build_catalogue() -> Catalogue {
    let mut map = HashMap::new();
    let mut insert = |key: CatalogueKey, lang: Language, content: &str, action: FallbackAction| {
        map.insert((key, lang), FallbackEntry::new(content, action));
    };

    // Per-intent entries: used when the LLM call itself errors out for a
    // reason other than timeout or an open circuit (§4.11, §7 "LLM error").
    insert(
        CatalogueKey::Intent(Intent::SmallTalk),
        Language::English,
        "I'm having trouble chatting right now, but I'm still here for you.",
        FallbackAction::Retry,
    );
    insert(
        CatalogueKey::Intent(Intent::SmallTalk),
        Language::Spanish,
        "Estoy teniendo problemas para conversar ahora mismo, pero sigo aqui contigo.",
        FallbackAction::Retry,
    );
    insert(
        CatalogueKey::Intent(Intent::SmallTalk),
        Language::French,
        "J'ai du mal a discuter pour le moment, mais je suis toujours la pour vous.",
        FallbackAction::Retry,
    );

    insert(
        CatalogueKey::Intent(Intent::PregnancyQuestion),
        Language::English,
        "I can't look that up right now. Please try again in a moment, or ask your provider.",
        FallbackAction::Retry,
    );
    insert(
        CatalogueKey::Intent(Intent::PregnancyQuestion),
        Language::Spanish,
        "No puedo buscar eso ahora. Intenta de nuevo en un momento, o consulta a tu medico.",
        FallbackAction::Retry,
    );
    insert(
        CatalogueKey::Intent(Intent::PregnancyQuestion),
        Language::French,
        "Je ne peux pas verifier cela maintenant. Reessayez dans un instant, ou consultez votre medecin.",
        FallbackAction::Retry,
    );

    insert(
        CatalogueKey::Intent(Intent::SchedulingRelated),
        Language::English,
        "I can't manage scheduling right now. Please try again shortly.",
        FallbackAction::Retry,
    );
    insert(
        CatalogueKey::Intent(Intent::SchedulingRelated),
        Language::Spanish,
        "No puedo gestionar citas en este momento. Intenta de nuevo en breve.",
        FallbackAction::Retry,
    );
    insert(
        CatalogueKey::Intent(Intent::SchedulingRelated),
        Language::French,
        "Je ne peux pas gerer les rendez-vous pour le moment. Reessayez bientot.",
        FallbackAction::Retry,
    );

    insert(
        CatalogueKey::Intent(Intent::Unclear),
        Language::English,
        "I'm having trouble responding right now. Please try again in a moment.",
        FallbackAction::Retry,
    );
    insert(
        CatalogueKey::Intent(Intent::Unclear),
        Language::Spanish,
        "Tengo problemas para responder ahora. Intenta de nuevo en un momento.",
        FallbackAction::Retry,
    );
    insert(
        CatalogueKey::Intent(Intent::Unclear),
        Language::French,
        "J'ai du mal a repondre pour le moment. Reessayez dans un instant.",
        FallbackAction::Retry,
    );

    // §4.11: symptom_report under any other LLM error gets the general
    // emergency action, independent of degraded mode.
    insert(
        CatalogueKey::Intent(Intent::SymptomReport),
        Language::English,
        "I can't process that right now. If you're experiencing a medical emergency, contact your provider or emergency services immediately.",
        FallbackAction::Emergency,
    );
    insert(
        CatalogueKey::Intent(Intent::SymptomReport),
        Language::Spanish,
        "No puedo procesar eso ahora mismo. Si tienes una emergencia medica, contacta a tu medico o a los servicios de emergencia de inmediato.",
        FallbackAction::Emergency,
    );
    insert(
        CatalogueKey::Intent(Intent::SymptomReport),
        Language::French,
        "Je ne peux pas traiter cela pour le moment. En cas d'urgence medicale, contactez immediatement votre medecin ou les services d'urgence.",
        FallbackAction::Emergency,
    );

    // Degraded-mode entries (LLM timeout / open circuit breaker), shared
    // across non-symptom intents. A symptom-report intent instead draws
    // from `DEGRADED_EMERGENCY` below (S5: action=contact_support, but
    // with emergency wording).
    insert(
        CatalogueKey::Timeout,
        Language::English,
        "The assistant is taking longer than expected to respond. Please try again shortly.",
        FallbackAction::ContactSupport,
    );
    insert(
        CatalogueKey::Timeout,
        Language::Spanish,
        "El asistente esta tardando mas de lo esperado en responder. Intenta de nuevo en breve.",
        FallbackAction::ContactSupport,
    );
    insert(
        CatalogueKey::Timeout,
        Language::French,
        "L'assistant met plus de temps que prevu a repondre. Reessayez bientot.",
        FallbackAction::ContactSupport,
    );

    insert(
        CatalogueKey::CircuitOpen,
        Language::English,
        "The assistant is temporarily unavailable. Please try again later or contact support.",
        FallbackAction::ContactSupport,
    );
    insert(
        CatalogueKey::CircuitOpen,
        Language::Spanish,
        "El asistente no esta disponible temporalmente. Intenta mas tarde o contacta a soporte.",
        FallbackAction::ContactSupport,
    );
    insert(
        CatalogueKey::CircuitOpen,
        Language::French,
        "L'assistant est temporairement indisponible. Reessayez plus tard ou contactez le support.",
        FallbackAction::ContactSupport,
    );

    map
}

/// Emergency-toned variants of the degraded-mode entries, consulted by
/// `for_timeout`/`for_circuit_open` only when the turn's intent is
/// symptom_report (S5); kept in a separate table so a plain non-symptom
/// lookup never accidentally picks up emergency wording.
static DEGRADED_EMERGENCY: Lazy<HashMap<(CatalogueKey, Language), FallbackEntry>> = Lazy::new(|| {
    let mut map = HashMap::new();
    let mut insert = |key: CatalogueKey, lang: Language, content: &str| {
        map.insert((key, lang), FallbackEntry::new(content, FallbackAction::ContactSupport));
    };

    insert(
        CatalogueKey::Timeout,
        Language::English,
        "The assistant is taking longer than expected to respond. If you're experiencing a medical emergency, contact your provider or emergency services immediately.",
    );
    insert(
        CatalogueKey::Timeout,
        Language::Spanish,
        "El asistente esta tardando mas de lo esperado en responder. Si tienes una emergencia medica, contacta a tu medico o a los servicios de emergencia de inmediato.",
    );
    insert(
        CatalogueKey::Timeout,
        Language::French,
        "L'assistant met plus de temps que prevu a repondre. En cas d'urgence medicale, contactez immediatement votre medecin ou les services d'urgence.",
    );

    insert(
        CatalogueKey::CircuitOpen,
        Language::English,
        "The assistant is temporarily unavailable. If you're experiencing a medical emergency, contact your provider or emergency services immediately.",
    );
    insert(
        CatalogueKey::CircuitOpen,
        Language::Spanish,
        "El asistente no esta disponible temporalmente. Si tienes una emergencia medica, contacta a tu medico o a los servicios de emergencia de inmediato.",
    );
    insert(
        CatalogueKey::CircuitOpen,
        Language::French,
        "L'assistant est temporairement indisponible. En cas d'urgence medicale, contactez immediatement votre medecin ou les services d'urgence.",
    );

    map
});

fn lookup(key: CatalogueKey, language: Language) -> FallbackEntry {
    CATALOGUE
        .get(&(key, language))
        .or_else(|| CATALOGUE.get(&(key, Language::English)))
        .cloned()
        .expect("English catalogue entry always present for every key")
}

/// `for_intent(intent, language)` (§4.11): the general per-intent fallback,
/// used for any LLM error other than a timeout or an open circuit.
pub fn for_intent(intent: Intent, language: Language) -> FallbackEntry {
    lookup(CatalogueKey::Intent(intent), language)
}

/// `for_timeout(intent, language)` (§4.11, §7): degraded-mode fallback for
/// an LLM call that exceeded its timeout.
pub fn for_timeout(intent: Intent, language: Language) -> FallbackEntry {
    degraded(CatalogueKey::Timeout, intent, language)
}

/// `for_circuit_open(intent, language)` (§4.11, §7, S5): degraded-mode
/// fallback for a short-circuited call.
pub fn for_circuit_open(intent: Intent, language: Language) -> FallbackEntry {
    degraded(CatalogueKey::CircuitOpen, intent, language)
}

fn degraded(key: CatalogueKey, intent: Intent, language: Language) -> FallbackEntry {
    if intent == Intent::SymptomReport {
        DEGRADED_EMERGENCY
            .get(&(key, language))
            .or_else(|| DEGRADED_EMERGENCY.get(&(key, Language::English)))
            .cloned()
            .expect("English emergency entry always present for every degraded key")
    } else {
        lookup(key, language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_intent_has_an_english_entry() {
        for intent in [
            Intent::SmallTalk,
            Intent::PregnancyQuestion,
            Intent::SymptomReport,
            Intent::SchedulingRelated,
            Intent::Unclear,
        ] {
            let entry = for_intent(intent, Language::English);
            assert!(!entry.content.is_empty());
        }
    }

    #[test]
    fn symptom_report_general_fallback_is_emergency() {
        let entry = for_intent(Intent::SymptomReport, Language::English);
        assert_eq!(entry.action, FallbackAction::Emergency);
    }

    #[test]
    fn circuit_open_symptom_report_is_contact_support_with_emergency_wording() {
        let entry = for_circuit_open(Intent::SymptomReport, Language::French);
        assert_eq!(entry.action, FallbackAction::ContactSupport);
        assert!(entry.content.to_lowercase().contains("urgence"));
    }

    #[test]
    fn circuit_open_non_symptom_is_plain_contact_support() {
        let entry = for_circuit_open(Intent::SmallTalk, Language::English);
        assert_eq!(entry.action, FallbackAction::ContactSupport);
        assert!(!entry.content.to_lowercase().contains("emergency"));
    }

    #[test]
    fn unsupported_language_falls_back_to_english() {
        let entry = for_intent(Intent::SmallTalk, Language::Other);
        assert_eq!(entry, for_intent(Intent::SmallTalk, Language::English));
    }

    #[test]
    fn timeout_symptom_report_spanish_has_emergency_wording() {
        let entry = for_timeout(Intent::SymptomReport, Language::Spanish);
        assert_eq!(entry.action, FallbackAction::ContactSupport);
        assert!(entry.content.to_lowercase().contains("emergencia"));
    }
}
