// Expression type vocabulary
// Every operator and built-in function name the language knows about

use std::fmt;

macro_rules! expression_types {
    ($($(#[$meta:meta])* $variant:ident => $name:literal,)*) => {
        /// The fixed set of operator and function names.
        ///
        /// Names are the canonical spelling used in the function table and in
        /// printed expressions. Aliases such as `add` or `equals` are registered
        /// on the table itself and do not appear here.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ExpressionType {
            $($(#[$meta])* $variant,)*
        }

        impl ExpressionType {
            /// Every type, in declaration order.
            pub const ALL: &'static [ExpressionType] = &[$(ExpressionType::$variant,)*];

            /// Canonical name of this type.
            pub const fn name(self) -> &'static str {
                match self {
                    $(ExpressionType::$variant => $name,)*
                }
            }

            /// Resolve a canonical name back to its type.
            pub fn from_name(name: &str) -> Option<ExpressionType> {
                match name {
                    $($name => Some(ExpressionType::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

expression_types! {
    // Math
    Add => "+",
    Subtract => "-",
    Multiply => "*",
    Divide => "/",
    Min => "min",
    Max => "max",
    Power => "^",
    Mod => "%",
    Average => "average",
    Sum => "sum",
    Count => "count",
    Range => "range",
    Floor => "floor",
    Ceiling => "ceiling",
    Round => "round",
    Abs => "abs",
    Sqrt => "sqrt",

    // Comparisons
    LessThan => "<",
    LessThanOrEqual => "<=",
    Equal => "==",
    NotEqual => "!=",
    GreaterThan => ">",
    GreaterThanOrEqual => ">=",
    Exists => "exists",
    Contains => "contains",
    Empty => "empty",

    // Logic
    And => "&&",
    Or => "||",
    Not => "!",

    // String
    Concat => "&",
    Length => "length",
    Replace => "replace",
    ReplaceIgnoreCase => "replaceIgnoreCase",
    Split => "split",
    Substring => "substring",
    ToLower => "toLower",
    ToUpper => "toUpper",
    Trim => "trim",
    Join => "join",
    EndsWith => "endsWith",
    StartsWith => "startsWith",
    CountWord => "countWord",
    AddOrdinal => "addOrdinal",
    NewGuid => "newGuid",
    IndexOf => "indexOf",
    LastIndexOf => "lastIndexOf",
    Eol => "EOL",
    SentenceCase => "sentenceCase",
    TitleCase => "titleCase",
    FormatNumber => "formatNumber",

    // DateTime
    AddDays => "addDays",
    AddHours => "addHours",
    AddMinutes => "addMinutes",
    AddSeconds => "addSeconds",
    DayOfMonth => "dayOfMonth",
    DayOfWeek => "dayOfWeek",
    DayOfYear => "dayOfYear",
    Month => "month",
    Date => "date",
    Year => "year",
    UtcNow => "utcNow",
    FormatDateTime => "formatDateTime",
    FormatEpoch => "formatEpoch",
    FormatTicks => "formatTicks",
    SubtractFromTime => "subtractFromTime",
    DateReadBack => "dateReadBack",
    GetTimeOfDay => "getTimeOfDay",
    GetFutureTime => "getFutureTime",
    GetPastTime => "getPastTime",
    ConvertFromUtc => "convertFromUTC",
    ConvertToUtc => "convertToUTC",
    AddToTime => "addToTime",
    StartOfDay => "startOfDay",
    StartOfHour => "startOfHour",
    StartOfMonth => "startOfMonth",
    Ticks => "ticks",
    TicksToDays => "ticksToDays",
    TicksToHours => "ticksToHours",
    TicksToMinutes => "ticksToMinutes",
    DateTimeDiff => "dateTimeDiff",

    // Conversions
    Float => "float",
    Int => "int",
    String => "string",
    Bool => "bool",
    Binary => "binary",
    Base64 => "base64",
    Base64ToBinary => "base64ToBinary",
    Base64ToString => "base64ToString",
    DataUri => "dataUri",
    DataUriToBinary => "dataUriToBinary",
    DataUriToString => "dataUriToString",
    UriComponent => "uriComponent",
    UriComponentToString => "uriComponentToString",
    JsonStringify => "jsonStringify",

    // Memory
    /// Property access, `a.b`.
    Accessor => "Accessor",
    /// Index access, `a[b]`.
    Element => "Element",
    CreateArray => "createArray",
    Array => "array",
    First => "first",
    Last => "last",
    Foreach => "foreach",
    Select => "select",
    Where => "where",
    Any => "any",
    All => "all",
    Union => "union",
    Intersection => "intersection",
    Skip => "skip",
    Take => "take",
    SubArray => "subArray",
    SortBy => "sortBy",
    SortByDescending => "sortByDescending",
    IndicesAndValues => "indicesAndValues",
    Flatten => "flatten",
    Unique => "unique",
    Reverse => "reverse",

    // Misc
    Constant => "Constant",
    Lambda => "Lambda",
    If => "if",
    Rand => "rand",
    Json => "json",
    AddProperty => "addProperty",
    RemoveProperty => "removeProperty",
    SetProperty => "setProperty",
    GetProperty => "getProperty",
    Coalesce => "coalesce",
    JPath => "jPath",
    SetPathToValue => "setPathToValue",
    Merge => "merge",
    SimpleEntity => "simpleEntity",
    Callstack => "callstack",

    // Type checking
    IsString => "isString",
    IsInteger => "isInteger",
    IsFloat => "isFloat",
    IsArray => "isArray",
    IsObject => "isObject",
    IsBoolean => "isBoolean",
    IsDateTime => "isDateTime",

    // XML
    Xml => "xml",
    XPath => "xPath",

    // URI parsing
    UriHost => "uriHost",
    UriPath => "uriPath",
    UriPathAndQuery => "uriPathAndQuery",
    UriPort => "uriPort",
    UriQuery => "uriQuery",
    UriScheme => "uriScheme",

    // Regex
    IsMatch => "isMatch",
}

impl ExpressionType {
    /// Comprehensions that bind an iterator name over their third child.
    pub fn is_comprehension(self) -> bool {
        matches!(
            self,
            ExpressionType::Foreach
                | ExpressionType::Select
                | ExpressionType::Where
                | ExpressionType::Any
                | ExpressionType::All
        )
    }
}

impl fmt::Display for ExpressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<ExpressionType> for std::sync::Arc<str> {
    fn from(ty: ExpressionType) -> Self {
        std::sync::Arc::from(ty.name())
    }
}
