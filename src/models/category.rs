use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

macro_rules! categories {
    ($($variant:ident => $label:literal),+ $(,)?) => {
        /// Business sector a search is restricted to. Serialized as its label.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum Category {
            $(#[serde(rename = $label)] $variant,)+
        }

        impl Category {
            pub const ALL: &'static [Category] = &[$(Category::$variant,)+];

            pub fn label(self) -> &'static str {
                match self {
                    $(Category::$variant => $label,)+
                }
            }
        }
    };
}

categories! {
    Trade => "التجارة",
    Contracting => "المقاولات",
    FacilityOperations => "التشغيل والصيانة والنظافة للمنشآت",
    RealEstate => "العقارات والأراضي",
    IndustryMining => "الصناعة والتعدين والتدوير",
    GasWaterEnergy => "الغاز والمياه والطاقة",
    MinesPetroleum => "المناجم والبترول والمحاجر",
    MediaPublishing => "الإعلام والنشر والتوزيع",
    TelecomIt => "الاتصالات وتقنية المعلومات",
    AgricultureFishing => "الزراعة والصيد",
    Healthcare => "الرعاية الصحية والنقاهة",
    EducationTraining => "التعليم والتدريب",
    Recruitment => "التوظيف والاستقدام",
    SecuritySafety => "الأمن والسلامة",
    TransportPostStorage => "النقل والبريد والتخزين",
    Consulting => "المهن الاستشارية",
    TourismHospitality => "السياحة والمطاعم والفنادق وتنظيم المعارض",
    FinanceInsurance => "المالية والتمويل والتأمين",
    OtherServices => "الخدمات الأخرى",
}

impl Default for Category {
    fn default() -> Self {
        Category::Trade
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category '{}'", self.0)
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.label() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}
