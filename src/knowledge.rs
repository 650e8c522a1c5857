//! HR Knowledge Base
//!
//! Fixed content the bot answers from:
//! - Seed FAQ entries loaded into the answer store on first start
//! - Ordered keyword fallback consulted when the store has no match
//! - Default menu and the shortcut topics offered in the chat shell

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// A stored category/question/answer triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub category: Cow<'static, str>,
    pub question: Cow<'static, str>,
    pub answer: Cow<'static, str>,
}

impl FaqEntry {
    pub const fn new(category: &'static str, question: &'static str, answer: &'static str) -> Self {
        Self {
            category: Cow::Borrowed(category),
            question: Cow::Borrowed(question),
            answer: Cow::Borrowed(answer),
        }
    }

    pub fn owned(
        category: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            category: Cow::Owned(category.into()),
            question: Cow::Owned(question.into()),
            answer: Cow::Owned(answer.into()),
        }
    }

    /// Case-sensitive containment of `needle` in the question or the answer
    pub fn contains(&self, needle: &str) -> bool {
        self.question.contains(needle) || self.answer.contains(needle)
    }
}

/// One entry of the keyword fallback table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordAnswer {
    pub keyword: &'static str,
    pub answer: &'static str,
}

impl KeywordAnswer {
    pub const fn new(keyword: &'static str, answer: &'static str) -> Self {
        Self { keyword, answer }
    }
}

pub const SEED_FAQS: &[FaqEntry] = &[
    FaqEntry::new(
        "Vacaciones",
        "¿Cómo solicito vacaciones?",
        "Las vacaciones se solicitan a través del portal empleados.nutrisco.cl con al menos 15 días de anticipación.",
    ),
    FaqEntry::new(
        "Bonos",
        "¿Cuándo se pagan los bonos?",
        "Los bonos de productividad se pagan al final de cada trimestre. El bono navideño se paga el 15 de diciembre.",
    ),
    FaqEntry::new(
        "Licencia",
        "¿Qué hacer en caso de licencia médica?",
        "1. Notificar a tu jefe inmediato\n2. Enviar certificado a RRHH\n3. Completar formulario L-01 en el portal",
    ),
    FaqEntry::new(
        "Seguro",
        "¿Cómo funciona el seguro de salud?",
        "Contamos con Seguro Consalud. Teléfono: 600 400 2000\nPortal: consalud.cl/nutrisco\nCobertura familiar disponible.",
    ),
    FaqEntry::new(
        "Horario",
        "¿Cuál es el horario de trabajo?",
        "Lunes a Viernes: 9:00 - 18:00\nHorario flexible: Entrada entre 8:00-9:30\nAlmuerzo: 13:00-14:00",
    ),
    FaqEntry::new(
        "Home Office",
        "¿Cuál es la política de teletrabajo?",
        "Máximo 3 días por semana de teletrabajo previa autorización del jefe. Requiere conexión estable y cumplimiento de metas.",
    ),
];

const VACATION_POLICY: &str = r#"**🏖️ POLÍTICA DE VACACIONES NUTRISCO**
        
- **1-5 años de antigüedad:** 15 días hábiles
- **5-10 años de antigüedad:** 20 días hábiles  
- **+10 años de antigüedad:** 30 días hábiles

📅 **Cómo solicitar:**
1. Portal: empleados.nutrisco.cl
2. Mínimo 15 días de anticipación
3. Aprobación del jefe directo

ℹ️ Más info: beneficios@nutrisco.com"#;

const BONUS_SYSTEM: &str = r#"**💰 SISTEMA DE BONOS**
        
- **Bono Productividad:** Fin de cada trimestre (Mar, Jun, Sep, Dic)
- **Bono Navidad:** 15 de Diciembre
- **Bono Resultados:** Evaluación anual (Enero)

📊 **Cálculo:** Basado en metas individuales y de equipo

💼 **Consulta específica:** Contactar a tu jefe directo"#;

const MEDICAL_LEAVE: &str = r#"**🏥 LICENCIA MÉDICA - PROCEDIMIENTO**
        
1. **Notificación Inmediata:** Informar a tu jefe
2. **Certificado Médico:** Enviar a RRHH en 48 horas
3. **Formulario L-01:** Completar en portal empleados
4. **Seguimiento:** Coordinación con Consalud

📞 **Contacto RRHH:** +56 2 2345 6789
📧 **Email:** licencias@nutrisco.cl"#;

const HEALTH_INSURANCE: &str = r#"**🏥 SEGURO DE SALUD CONSALUD**
        
- **Teléfono Emergencias:** 600 400 2000
- **Portal:** consalud.cl/nutrisco
- **Usuario:** Tu RUT (sin puntos ni guión)
- **Clave:** Primeras 4 letras nombre + últimos 4 RUT

🏥 **Cobertura Familiar:** Cónyuge e hijos menores de 25 años

💊 **Farmacias:** Red cerrada con 30% descuento"#;

const PAYROLL: &str = r#"**💰 INFORMACIÓN DE REMUNERACIONES**
        
- **Día de pago:** Último día hábil del mes
- **Método:** Transferencia bancaria
- **Desglose:** Disponible en portal empleados

📋 **Liquidaciones:** Acceso histórico completo
📊 **Bonos:** Aparecen como ítems separados

❓ **Consultas:** contabilidad@nutrisco.cl"#;

/// Ordered keyword fallback. The first keyword found in the lower-cased
/// query wins, so more specific keywords must come first.
pub const KEYWORD_ANSWERS: &[KeywordAnswer] = &[
    KeywordAnswer::new("vacaciones", VACATION_POLICY),
    KeywordAnswer::new("bono", BONUS_SYSTEM),
    KeywordAnswer::new("licencia", MEDICAL_LEAVE),
    KeywordAnswer::new("seguro", HEALTH_INSURANCE),
    KeywordAnswer::new("salario", PAYROLL),
];

/// Returned when neither the store nor the keyword table matches.
pub const DEFAULT_MENU: &str = r#"Hola, soy el chatbot de RRHH de Nutrisco. 

Puedo ayudarte con información sobre:
• Vacaciones y días libres
• Bonos y remuneraciones  
• Licencias médicas
• Seguro de salud
• Políticas de teletrabajo
• Beneficios para empleados

¿En qué tema específico necesitas ayuda?"#;

/// Shortcut topics offered by the chat shell
///
/// Picking a topic injects its query exactly as if the user had typed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Vacations,
    Bonuses,
    MedicalLeave,
    HealthInsurance,
    HomeOffice,
    WorkingHours,
}

impl Topic {
    pub const ALL: [Topic; 6] = [
        Topic::Vacations,
        Topic::Bonuses,
        Topic::MedicalLeave,
        Topic::HealthInsurance,
        Topic::HomeOffice,
        Topic::WorkingHours,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Topic::Vacations => "Vacaciones",
            Topic::Bonuses => "Bonos",
            Topic::MedicalLeave => "Licencia",
            Topic::HealthInsurance => "Seguro",
            Topic::HomeOffice => "Home Office",
            Topic::WorkingHours => "Horarios",
        }
    }

    /// Query string injected when the topic is selected
    pub fn query(self) -> &'static str {
        match self {
            Topic::Vacations => "vacaciones",
            Topic::Bonuses => "bonos",
            Topic::MedicalLeave => "licencia médica",
            Topic::HealthInsurance => "seguro de salud",
            Topic::HomeOffice => "teletrabajo",
            Topic::WorkingHours => "horario de trabajo",
        }
    }

    /// Look a topic up by its label, ignoring case and surrounding whitespace
    pub fn from_label(label: &str) -> Option<Topic> {
        let wanted = label.trim().to_lowercase();
        Topic::ALL
            .into_iter()
            .find(|topic| topic.label().to_lowercase() == wanted)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
