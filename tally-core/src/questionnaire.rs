//! The PrEP/PEP questionnaire: questions, their allowed labels, and the
//! checks a form runs before handing answers to the store.

use crate::error::ValidationError;
use crate::types::{Answers, MULTI_VALUE_SEPARATOR};

/// Form section a question belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    Knowledge,
    Experience,
    Demographics,
    KnowledgeCheck,
    Feedback,
}

impl Part {
    pub fn title(self) -> &'static str {
        match self {
            Self::Knowledge => "Parte 1: Conhecimento sobre PrEP/PEP",
            Self::Experience => "Parte 2: Experiência Pessoal",
            Self::Demographics => "Parte 3: Perfil Demográfico",
            Self::KnowledgeCheck => "Verificação de Conhecimento",
            Self::Feedback => "Comentários",
        }
    }
}

/// How a question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerKind {
    /// Exactly one of the options.
    Single,
    /// Any subset of the options, joined with `", "`.
    Multi,
    /// Free text.
    Text,
}

#[derive(Debug)]
pub struct Question {
    pub field: &'static str,
    pub prompt: &'static str,
    pub part: Part,
    pub kind: AnswerKind,
    pub options: &'static [&'static str],
    /// Part of the base schema rather than an optional extension.
    pub required: bool,
}

const KNOWLEDGE_LEVELS: &[&str] = &[
    "Sim, conheço bem",
    "Conheço parcialmente",
    "Já ouvi falar mas não sei detalhes",
    "Não conheço",
];

const TRUE_FALSE: &[&str] = &["Verdadeiro", "Falso", "Não sei"];

static QUESTIONS: &[Question] = &[
    Question {
        field: "Conhecimento_PrEP",
        prompt: "Você conhece a PrEP (Profilaxia Pré-Exposição)?",
        part: Part::Knowledge,
        kind: AnswerKind::Single,
        options: KNOWLEDGE_LEVELS,
        required: true,
    },
    Question {
        field: "Conhecimento_PEP",
        prompt: "E a PEP (Profilaxia Pós-Exposição)?",
        part: Part::Knowledge,
        kind: AnswerKind::Single,
        options: KNOWLEDGE_LEVELS,
        required: true,
    },
    Question {
        field: "Acesso_servicos",
        prompt: "Você sabe onde conseguir PrEP/PEP em São Paulo?",
        part: Part::Experience,
        kind: AnswerKind::Single,
        options: &[
            "Sim, conheço vários serviços",
            "Conheço apenas um local",
            "Não sei mas gostaria de saber",
            "Não sei e não tenho interesse",
        ],
        required: true,
    },
    Question {
        field: "Fonte_informacao",
        prompt: "Como você ficou sabendo sobre PrEP/PEP?",
        part: Part::Experience,
        kind: AnswerKind::Single,
        options: &[
            "Profissional de saúde",
            "Amigos/conhecidos",
            "Internet/redes sociais",
            "Material informativo (folhetos, cartazes)",
            "Nunca ouvi falar",
            "Outra fonte",
        ],
        required: true,
    },
    Question {
        field: "Uso_PrepPEP",
        prompt: "Você já usou ou usa PrEP/PEP?",
        part: Part::Experience,
        kind: AnswerKind::Single,
        // "pastado" matches the label stored by earlier form versions.
        options: &[
            "Sim, uso atualmente",
            "Sim, já usei no pastado",
            "Não, mas pretendo usar",
            "Não uso e não tenho interesse",
            "Prefiro não responder",
        ],
        required: true,
    },
    Question {
        field: "Conhece_usuarios",
        prompt: "Conhece alguém que usa ou já usou PrEP/PEP?",
        part: Part::Experience,
        kind: AnswerKind::Single,
        options: &[
            "Sim, vários conhecidos",
            "Sim, algumas pessoas",
            "Não conheço ninguém",
            "Prefiro não responder",
        ],
        required: true,
    },
    Question {
        field: "Teste_HIV_frequencia",
        prompt: "Com que frequência você faz teste de HIV?",
        part: Part::Experience,
        kind: AnswerKind::Single,
        options: &[
            "A cada 3 meses",
            "A cada 6 meses",
            "Uma vez por ano",
            "Raramente faço",
            "Nunca fiz",
            "Prefiro não responder",
        ],
        required: true,
    },
    Question {
        field: "Metodos_prevencao",
        prompt: "Quais métodos de prevenção ao HIV você utiliza?",
        part: Part::Experience,
        kind: AnswerKind::Multi,
        options: &[
            "PrEP",
            "PEP",
            "Camisinha masculina",
            "Camisinha feminina",
            "Testagem regular",
            "Não utilizo métodos de prevenção",
            "Outro",
        ],
        required: true,
    },
    Question {
        field: "Genero",
        prompt: "Identidade de gênero:",
        part: Part::Demographics,
        kind: AnswerKind::Single,
        options: &[
            "Mulher cisgênero",
            "Homem cisgênero",
            "Mulher trans/transgênero",
            "Homem trans/transgênero",
            "Pessoa não-binária",
            "Travesti",
            "Agênero",
            "Gênero fluido",
            "Outro",
            "Prefiro não responder",
        ],
        required: true,
    },
    Question {
        field: "Orientacao_sexual",
        prompt: "Orientação sexual:",
        part: Part::Demographics,
        kind: AnswerKind::Single,
        options: &[
            "Assexual",
            "Bissexual",
            "Gay",
            "Lésbica",
            "Pansexual",
            "Heterossexual",
            "Queer",
            "Outra",
            "Prefiro não responder",
        ],
        required: true,
    },
    Question {
        field: "Raca",
        prompt: "Raça/Cor:",
        part: Part::Demographics,
        kind: AnswerKind::Single,
        options: &[
            "Amarela (origem asiática)",
            "Branca",
            "Indígena",
            "Parda",
            "Preta",
            "Prefiro não responder",
        ],
        required: true,
    },
    Question {
        field: "Faixa_etaria",
        prompt: "Faixa etária:",
        part: Part::Demographics,
        kind: AnswerKind::Single,
        options: &[
            "13-17",
            "18-24",
            "25-29",
            "30-39",
            "40-49",
            "50-59",
            "60+",
            "Prefiro não responder",
        ],
        required: true,
    },
    Question {
        field: "Renda",
        prompt: "Renda mensal individual:",
        part: Part::Demographics,
        kind: AnswerKind::Single,
        options: &[
            "Até 1 salário mínimo",
            "1-2 salários mínimos",
            "2-3 salários mínimos",
            "3-5 salários mínimos",
            "Mais de 5 salários mínimos",
            "Prefiro não responder",
        ],
        required: true,
    },
    Question {
        field: "Regiao",
        prompt: "Região de São Paulo onde mora:",
        part: Part::Demographics,
        kind: AnswerKind::Single,
        options: &[
            "Centro expandido",
            "Zona Norte",
            "Zona Sul",
            "Zona Leste",
            "Zona Oeste",
            "Região Metropolitana",
            "Não moro em São Paulo",
            "Prefiro não responder",
        ],
        required: true,
    },
    Question {
        field: "Verificacao_PrEP",
        prompt: "A PrEP deve ser tomada antes de uma possível exposição ao HIV.",
        part: Part::KnowledgeCheck,
        kind: AnswerKind::Single,
        options: TRUE_FALSE,
        required: false,
    },
    Question {
        field: "Verificacao_PEP",
        prompt: "A PEP deve ser iniciada em até 72 horas após a exposição.",
        part: Part::KnowledgeCheck,
        kind: AnswerKind::Single,
        options: TRUE_FALSE,
        required: false,
    },
    Question {
        field: "Comentarios",
        prompt: "Comentários ou sugestões:",
        part: Part::Feedback,
        kind: AnswerKind::Text,
        options: &[],
        required: false,
    },
];

/// Every question in form order.
pub fn questions() -> &'static [Question] {
    QUESTIONS
}

pub fn question(field: &str) -> Option<&'static Question> {
    QUESTIONS.iter().find(|q| q.field == field)
}

/// Flatten a multi-select answer for storage.
pub fn join_multi<S: AsRef<str>>(selected: &[S]) -> String {
    selected
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(MULTI_VALUE_SEPARATOR)
}

/// Split a stored multi-select answer. The empty string means nothing selected.
pub fn split_multi(value: &str) -> Vec<&str> {
    if value.is_empty() {
        Vec::new()
    } else {
        value.split(MULTI_VALUE_SEPARATOR).collect()
    }
}

impl Question {
    /// Check one answer against the question's allowed labels.
    pub fn check(&self, value: &str) -> Result<(), ValidationError> {
        let allowed = |v: &str| self.options.iter().any(|o| *o == v);
        let ok = match self.kind {
            AnswerKind::Text => true,
            AnswerKind::Single => allowed(value) || (!self.required && value.is_empty()),
            AnswerKind::Multi => split_multi(value).into_iter().all(allowed),
        };
        if ok {
            Ok(())
        } else {
            Err(ValidationError::UnknownChoice {
                field: self.field.to_string(),
                value: value.to_string(),
            })
        }
    }
}

/// Check every answered question against its labels. Fields without a
/// question are left to the store's own validation.
pub fn validate_choices(answers: &Answers) -> Result<(), ValidationError> {
    for (field, value) in answers {
        if let Some(q) = question(field) {
            q.check(value)?;
        }
    }
    Ok(())
}

/// Submissions are accepted only with the respondent's consent.
pub fn require_consent(consent: bool) -> Result<(), ValidationError> {
    if consent {
        Ok(())
    } else {
        Err(ValidationError::ConsentRequired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BASE_FIELDS, DECLARED_EXTENSIONS};

    #[test]
    fn catalog_covers_base_and_declared_fields() {
        let required: Vec<&str> = questions()
            .iter()
            .filter(|q| q.required)
            .map(|q| q.field)
            .collect();
        assert_eq!(required, BASE_FIELDS);

        let optional: Vec<&str> = questions()
            .iter()
            .filter(|q| !q.required)
            .map(|q| q.field)
            .collect();
        assert_eq!(optional, DECLARED_EXTENSIONS);
    }

    #[test]
    fn single_choice_must_match_a_label() {
        let q = question("Faixa_etaria").unwrap();
        assert!(q.check("25-29").is_ok());
        assert_eq!(
            q.check("26"),
            Err(ValidationError::UnknownChoice {
                field: "Faixa_etaria".into(),
                value: "26".into()
            })
        );
        assert!(q.check("").is_err());
        assert!(question("Verificacao_PrEP").unwrap().check("").is_ok());
    }

    #[test]
    fn multi_choice_checks_each_label() {
        let q = question("Metodos_prevencao").unwrap();
        assert!(q.check("").is_ok());
        assert!(q.check(&join_multi(&["PrEP", "Camisinha masculina"])).is_ok());
        assert!(q.check("PrEP, Vacina").is_err());
    }

    #[test]
    fn labels_containing_separator_are_single_choice() {
        let q = question("Fonte_informacao").unwrap();
        assert!(q.check("Material informativo (folhetos, cartazes)").is_ok());
    }

    #[test]
    fn free_text_accepts_anything() {
        assert!(question("Comentarios").unwrap().check("qualquer coisa").is_ok());
    }

    #[test]
    fn validate_choices_skips_unknown_fields() {
        let mut answers = Answers::new();
        answers.insert("Genero".into(), "Travesti".into());
        answers.insert("Campo_novo".into(), "livre".into());
        assert!(validate_choices(&answers).is_ok());

        answers.insert("Raca".into(), "Azul".into());
        assert!(matches!(
            validate_choices(&answers),
            Err(ValidationError::UnknownChoice { .. })
        ));
    }

    #[test]
    fn split_and_join_multi() {
        assert!(split_multi("").is_empty());
        assert_eq!(split_multi("PrEP, PEP"), ["PrEP", "PEP"]);
        assert_eq!(join_multi::<&str>(&[]), "");
    }

    #[test]
    fn consent_gate() {
        assert!(require_consent(true).is_ok());
        assert_eq!(require_consent(false), Err(ValidationError::ConsentRequired));
    }
}
