//! Built-in GDPR (DSGVO) protocol, in German.

use super::parser::{Category, Protocol};

/// (key, title, criteria)
const GDPR_SECTIONS: &[(&str, &str, &[&str])] = &[
    (
        "personal_data",
        "Identifikation personenbezogener Daten",
        &[
            "Prüfung der Verarbeitung personenbezogener Daten",
            "Identifikation der Arten gesammelter personenbezogener Daten",
            "Überprüfung der Datensparsamkeit",
            "Prüfung auf besondere Kategorien personenbezogener Daten",
            "Verifizierung der Zweckbestimmung der Datenverarbeitung",
        ],
    ),
    (
        "legal_basis",
        "Rechtliche Grundlagen",
        &[
            "Überprüfung der rechtlichen Grundlage für die Datenverarbeitung",
            "Prüfung der ordnungsgemäßen Einwilligung",
            "Dokumentation des berechtigten Interesses",
            "Verifizierung der vertraglichen Notwendigkeit",
            "Prüfung der gesetzlichen Verpflichtungen",
        ],
    ),
    (
        "data_subject_rights",
        "Rechte der betroffenen Person",
        &[
            "Sicherstellung des Auskunftsrechts",
            "Prüfung der Berichtigungsverfahren",
            "Verifizierung des Löschungsrechts (Recht auf Vergessenwerden)",
            "Sicherstellung der Datenübertragbarkeit",
            "Prüfung der Widerspruchsverfahren",
            "Überprüfung der Einschränkungsrechte",
        ],
    ),
    (
        "data_security",
        "Datensicherheit",
        &[
            "Verifizierung angemessener technischer Maßnahmen",
            "Prüfung organisatorischer Sicherheitsmaßnahmen",
            "Sicherstellung der Datenverschlüsselung bei Übertragung und Speicherung",
            "Verifizierung von Zugriffskontrollen und Authentifizierung",
            "Prüfung der Pseudonymisierung und Anonymisierung",
        ],
    ),
    (
        "data_retention",
        "Datenaufbewahrung",
        &[
            "Prüfung der Datenaufbewahrungsrichtlinien",
            "Verifizierung der Löschverfahren",
            "Sicherstellung gerechtfertigter Aufbewahrungsfristen",
            "Prüfung der Datenarchivierungspraktiken",
            "Überprüfung der automatisierten Löschung",
        ],
    ),
    (
        "third_party_sharing",
        "Datenweitergabe an Dritte",
        &[
            "Verifizierung von Auftragsverarbeitungsverträgen",
            "Prüfung der Datenweitergabe an Dritte",
            "Sicherstellung angemessener Schutzmaßnahmen bei Übermittlungen",
            "Verifizierung der internationalen Datenübermittlung",
            "Prüfung der Standardvertragsklauseln",
        ],
    ),
    (
        "consent_management",
        "Einwilligungsverwaltung",
        &[
            "Prüfung der Einwilligungserhebung",
            "Verifizierung der Widerrufsmechanismen",
            "Sicherstellung der freiwilligen Einwilligung",
            "Prüfung der Einwilligungsdokumentation",
            "Überprüfung der altersgerechten Einwilligung",
        ],
    ),
    (
        "data_breaches",
        "Datenschutzverletzungen",
        &[
            "Verifizierung der Erkennungsverfahren für Datenschutzverletzungen",
            "Prüfung der Benachrichtigungspflichten",
            "Sicherstellung von Incident-Response-Plänen",
            "Verifizierung der Dokumentationsverfahren für Verletzungen",
            "Prüfung der Meldung an Aufsichtsbehörden",
        ],
    ),
    (
        "medical_data",
        "Medizinische Datenverarbeitung",
        &[
            "Prüfung der ärztlichen Schweigepflicht",
            "Verifizierung der medizinischen Zweckbestimmung",
            "Sicherstellung der Qualitätssicherung in der Medizin",
            "Prüfung der Forschungszwecke in der Medizin",
            "Überprüfung der Gesundheitsdatenverarbeitung",
            "Verifizierung der medizinischen Notfallverarbeitung",
        ],
    ),
    (
        "minors",
        "Daten von Minderjährigen",
        &[
            "Prüfung der Altersverifizierung",
            "Verifizierung der elterlichen Einwilligung",
            "Sicherstellung des Kinderschutzes",
            "Prüfung der altersgerechten Informationsvermittlung",
            "Überprüfung der besonderen Schutzmaßnahmen",
            "Verifizierung der Risikobewertung für Minderjährige",
        ],
    ),
    (
        "research_data",
        "Forschungsdatenverarbeitung",
        &[
            "Prüfung der wissenschaftlichen Forschungszwecke",
            "Verifizierung der Forschungsethik",
            "Sicherstellung der Forschungsfreiheit",
            "Prüfung der wissenschaftlichen Interessen",
            "Überprüfung der Forschungsdokumentation",
            "Verifizierung der Forschungsdatenarchivierung",
        ],
    ),
    (
        "public_administration",
        "Öffentliche Verwaltung",
        &[
            "Prüfung der behördlichen Aufgabenwahrnehmung",
            "Verifizierung der öffentlichen Interessen",
            "Sicherstellung der Transparenzpflichten",
            "Prüfung der behördlichen Informationspflichten",
            "Überprüfung der Verwaltungsverfahren",
            "Verifizierung der öffentlichen Sicherheit",
        ],
    ),
    (
        "employee_data",
        "Beschäftigtendatenschutz",
        &[
            "Prüfung der Beschäftigtendatenverarbeitung",
            "Verifizierung der betrieblichen Interessen",
            "Sicherstellung der Mitbestimmungsrechte",
            "Prüfung der Arbeitsplatzüberwachung",
            "Überprüfung der Beschäftigtendokumentation",
        ],
    ),
    (
        "marketing",
        "Marketing und Werbung",
        &[
            "Prüfung der Direktwerbung",
            "Verifizierung der Profilbildung",
            "Sicherstellung der Werbeeinwilligung",
            "Prüfung der Tracking-Technologien",
            "Überprüfung der Marketingdatenverarbeitung",
        ],
    ),
    (
        "video_surveillance",
        "Videoüberwachung",
        &[
            "Prüfung der Überwachungszwecke",
            "Verifizierung der Kennzeichnungspflichten",
            "Sicherstellung der Verhältnismäßigkeit",
            "Prüfung der Aufbewahrungsfristen für Aufnahmen",
            "Überprüfung der Zugriffsberechtigungen",
        ],
    ),
    (
        "big_data_ai",
        "Big Data und KI",
        &[
            "Prüfung der automatisierten Entscheidungsfindung",
            "Verifizierung der Profilbildung",
            "Sicherstellung der Erklärbarkeit",
            "Prüfung der algorithmischen Transparenz",
            "Überprüfung der KI-Ethik",
            "Verifizierung der menschlichen Aufsicht",
        ],
    ),
];

impl Protocol {
    /// The built-in GDPR protocol used when no protocol file is given.
    pub fn default_gdpr() -> Self {
        let categories = GDPR_SECTIONS
            .iter()
            .map(|(key, title, criteria)| {
                Category::new(*key, *title, criteria.iter().map(|c| c.to_string()).collect())
            })
            .collect();

        Self {
            name: Some("DSGVO-Prüfprotokoll".to_string()),
            description: None,
            categories,
        }
    }
}
