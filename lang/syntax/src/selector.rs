//! The closed vocabulary of built-in operations.

use crate::{block::BlockKind, shape::*};
use once_cell::sync::Lazy;
use std::{collections::HashMap, str::FromStr};

macro_rules! selectors {
    ( $( $cat:ident { $( $variant:ident => $id:literal, $kind:expr, $spec:literal; )* } )* ) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Selector {
            $( $( $variant, )* )*
        }

        impl Selector {
            pub const ALL: &'static [Selector] = &[ $( $( Selector::$variant, )* )* ];

            pub fn as_str(self) -> &'static str {
                match self {
                    $( $( | Selector::$variant => $id, )* )*
                }
            }
            pub fn kind(self) -> BlockKind {
                use BlockKind::*;
                match self {
                    $( $( | Selector::$variant => $kind, )* )*
                }
            }
            /// the label spec; empty for getters and custom blocks, whose
            /// blocks carry their own
            pub fn spec(self) -> &'static str {
                match self {
                    $( $( | Selector::$variant => $spec, )* )*
                }
            }
            pub fn category(self) -> Category {
                match self {
                    $( $( | Selector::$variant => Category::$cat, )* )*
                }
            }
        }
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Looks,
    Control,
    Sensing,
    Operators,
    Variables,
    Lists,
    Other,
}

selectors! {
    Looks {
        Bubble => "bubble", Command, "say %s";
        DoThink => "doThink", Command, "think %s";
        DoSayFor => "doSayFor", Command, "say %s for %n secs";
        DoThinkFor => "doThinkFor", Command, "think %s for %n secs";
        Alert => "alert", Command, "alert %mult%s";
        Log => "log", Command, "console log %mult%s";
    }
    Control {
        ReceiveGo => "receiveGo", Hat, "when %greenflag clicked";
        ReceiveKey => "receiveKey", Hat, "when %keyHat key pressed";
        ReceiveClick => "receiveClick", Hat, "when I am clicked";
        ReceiveMessage => "receiveMessage", Hat, "when I receive %msgHat";
        ReceiveOnClone => "receiveOnClone", Hat, "when I start as a clone";
        DoBroadcast => "doBroadcast", Command, "broadcast %msg";
        DoBroadcastAndWait => "doBroadcastAndWait", Command, "broadcast %msg and wait";
        GetLastMessage => "getLastMessage", Reporter, "message";
        DoWait => "doWait", Command, "wait %n secs";
        DoWaitUntil => "doWaitUntil", Command, "wait until %b";
        DoForever => "doForever", Command, "forever %c";
        DoRepeat => "doRepeat", Command, "repeat %n %c";
        DoUntil => "doUntil", Command, "repeat until %b %c";
        DoIf => "doIf", Command, "if %b %c";
        DoIfElse => "doIfElse", Command, "if %b %c else %c";
        DoStopThis => "doStopThis", Command, "stop %stopChoices";
        DoStopOthers => "doStopOthers", Command, "stop %stopOthersChoices";
        DoStop => "doStop", Command, "stop script";
        DoStopAll => "doStopAll", Command, "stop %stop";
        DoStopBlock => "doStopBlock", Command, "stop block";
        DoRun => "doRun", Command, "run %cmdRing %inputs";
        Fork => "fork", Command, "launch %cmdRing %inputs";
        Evaluate => "evaluate", Reporter, "call %repRing %inputs";
        DoReport => "doReport", Command, "report %s";
        DoCallCC => "doCallCC", Command, "run %cmdRing w/continuation";
        ReportCallCC => "reportCallCC", Reporter, "call %cmdRing w/continuation";
        DoWarp => "doWarp", Command, "warp %c";
        CreateClone => "createClone", Command, "create a clone of %cln";
        RemoveClone => "removeClone", Command, "delete this clone";
        DoPauseAll => "doPauseAll", Command, "pause all %pause";
        ReifyScript => "reifyScript", Ring(RingKind::Command), "%rc %ringparms";
        ReifyReporter => "reifyReporter", Ring(RingKind::Reporter), "%rr %ringparms";
        ReifyPredicate => "reifyPredicate", Ring(RingKind::Predicate), "%rp %ringparms";
    }
    Sensing {
        ReportStackSize => "reportStackSize", Reporter, "stack size";
        ReportFrameCount => "reportFrameCount", Reporter, "frames";
        DoResetTimer => "doResetTimer", Command, "reset timer";
        GetTimer => "getTimer", Reporter, "timer";
        ReportDate => "reportDate", Reporter, "current %dates";
        ReportAttributeOf => "reportAttributeOf", Reporter, "%att of %spr";
    }
    Operators {
        ReportSum => "reportSum", Reporter, "%n + %n";
        ReportDifference => "reportDifference", Reporter, "%n - %n";
        ReportProduct => "reportProduct", Reporter, "%n * %n";
        ReportQuotient => "reportQuotient", Reporter, "%n / %n";
        ReportModulus => "reportModulus", Reporter, "%n mod %n";
        ReportRound => "reportRound", Reporter, "round %n";
        ReportMonadic => "reportMonadic", Reporter, "%fun of %n";
        ReportRandom => "reportRandom", Reporter, "pick random %n to %n";
        ReportLessThan => "reportLessThan", Predicate, "%s < %s";
        ReportEquals => "reportEquals", Predicate, "%s = %s";
        ReportGreaterThan => "reportGreaterThan", Predicate, "%s > %s";
        ReportAnd => "reportAnd", Predicate, "%b and %b";
        ReportOr => "reportOr", Predicate, "%b or %b";
        ReportNot => "reportNot", Predicate, "not %b";
        ReportTrue => "reportTrue", Predicate, "true";
        ReportFalse => "reportFalse", Predicate, "false";
        ReportJoinWords => "reportJoinWords", Reporter, "join %words";
        ReportLetter => "reportLetter", Reporter, "letter %n of %s";
        ReportStringSize => "reportStringSize", Reporter, "length of %s";
        ReportUnicode => "reportUnicode", Reporter, "unicode of %s";
        ReportUnicodeAsLetter => "reportUnicodeAsLetter", Reporter, "unicode %n as letter";
        ReportTextSplit => "reportTextSplit", Reporter, "split %s by %delim";
        ReportTextFunction => "reportTextFunction", Reporter, "%txtfun of %s";
        ReportIsA => "reportIsA", Predicate, "is %s a %typ ?";
        ReportTypeOf => "reportTypeOf", Reporter, "type of %s";
        ReportIsIdentical => "reportIsIdentical", Predicate, "is %s identical to %s ?";
    }
    Variables {
        DoSetVar => "doSetVar", Command, "set %var to %s";
        DoChangeVar => "doChangeVar", Command, "change %var by %n";
        DoDeclareVariables => "doDeclareVariables", Command, "script variables %scriptVars";
        ReportGetVar => "reportGetVar", Reporter, "";
    }
    Lists {
        ReportNewList => "reportNewList", Reporter, "list %exp";
        ReportCons => "reportCONS", Reporter, "%s in front of %l";
        ReportCdr => "reportCDR", Reporter, "all but first of %l";
        ReportListItem => "reportListItem", Reporter, "item %idx of %l";
        ReportListLength => "reportListLength", Reporter, "length of %l";
        ReportListContainsItem => "reportListContainsItem", Predicate, "%l contains %s";
        DoAddToList => "doAddToList", Command, "add %s to %l";
        DoDeleteFromList => "doDeleteFromList", Command, "delete %ida of %l";
        DoInsertInList => "doInsertInList", Command, "insert %s at %idx of %l";
        DoReplaceInList => "doReplaceInList", Command, "replace item %idx of %l with %s";
        ReportMap => "reportMap", Reporter, "map %repRing over %l";
    }
    Other {
        EvaluateCustomBlock => "evaluateCustomBlock", Command, "";
        DoMapCodeOrHeader => "doMapCodeOrHeader", Command, "map %cmdRing to %codeKind %code";
        DoMapStringCode => "doMapStringCode", Command, "map String to code %code";
        DoMapListCode => "doMapListCode", Command, "map %codeListPart of %codeListKind to code %code";
        ReportMappedCode => "reportMappedCode", Reporter, "code of %cmdRing";
    }
}

/// older ids that load as their current counterpart
const MIGRATIONS: &[(&str, Selector)] = &[("reportTimer", Selector::GetTimer)];

static BY_ID: Lazy<HashMap<&'static str, Selector>> = Lazy::new(|| {
    let mut map: HashMap<_, _> = Selector::ALL.iter().map(|sel| (sel.as_str(), *sel)).collect();
    for (old, new) in MIGRATIONS {
        map.entry(*old).or_insert(*new);
    }
    map
});

impl FromStr for Selector {
    type Err = crate::err::SyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BY_ID.get(s).copied().ok_or_else(|| crate::err::SyntaxError::UnknownSelector(s.to_owned()))
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Selector {
    pub fn shapes(self) -> Vec<SlotShape> {
        spec_shapes(self.spec())
    }
    pub fn is_hat(self) -> bool {
        matches!(self.kind(), BlockKind::Hat)
    }
    pub fn is_ring(self) -> bool {
        matches!(self.kind(), BlockKind::Ring(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ids_round_trip_through_the_table() {
        for sel in Selector::ALL {
            assert_eq!(sel.as_str().parse::<Selector>().ok(), Some(*sel));
        }
    }

    #[test]
    fn migrated_ids_resolve() {
        assert_eq!("reportTimer".parse::<Selector>().ok(), Some(Selector::GetTimer));
        assert!("doTurn".parse::<Selector>().is_err());
    }

    #[test]
    fn shapes_follow_the_spec() {
        assert_eq!(
            Selector::DoIfElse.shapes(),
            vec![
                SlotShape::Boolean { unevaluated: false },
                SlotShape::Command(CommandSlot::Static),
                SlotShape::Command(CommandSlot::Static)
            ]
        );
        assert!(Selector::ReceiveGo.shapes().is_empty());
        assert_eq!(Selector::ReportJoinWords.category(), Category::Operators);
    }
}
