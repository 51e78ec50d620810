//! Built-in categories of suggested topics.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub id: &'static str,
    pub name: &'static str,
    pub topics: &'static [&'static str],
}

pub const CATEGORIES: &[Category] = &[
    Category {
        id: "politics",
        name: "Politique & Société",
        topics: &[
            "Situation sécuritaire au Sahel",
            "Élections présidentielles au Sénégal",
            "Sommet de la CEDEAO",
            "Transition politique au Burkina Faso",
        ],
    },
    Category {
        id: "economy",
        name: "Économie",
        topics: &[
            "Cours de l'or et du coton",
            "Inflation zone UEMOA",
            "Zone de libre-échange continentale (ZLECAf)",
            "Projets d'infrastructures en Afrique de l'Ouest",
        ],
    },
    Category {
        id: "sport",
        name: "Sport",
        topics: &[
            "Éliminatoires Coupe du Monde 2026 Afrique",
            "Ligue des Champions CAF",
            "Performance des athlètes africains",
            "Championnat national de football",
        ],
    },
    Category {
        id: "tech",
        name: "Tech & Innovation",
        topics: &[
            "Startups technologiques africaines",
            "Déploiement 5G en Afrique",
            "Intelligence Artificielle au service de l'agriculture",
            "Mobile Money et inclusion financière",
        ],
    },
];

pub fn find(id: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.id.eq_ignore_ascii_case(id))
}

/// Topic `pick` (1-based) of category `id`
pub fn topic(id: &str, pick: usize) -> Option<&'static str> {
    let index = pick.checked_sub(1)?;
    find(id)?.topics.get(index).copied()
}
